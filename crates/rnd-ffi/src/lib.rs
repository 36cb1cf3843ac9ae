//! C FFI layer for the research economy.
//!
//! The host's interception shim redirects each research call site to one of
//! the `rnd_*` override functions below. Every override function returns
//! `true` when the host must skip its own implementation and use the value
//! written through the out-pointer, and `false` when the host's default
//! should run (nothing is written in that case).
//!
//! # Safety
//!
//! Every `extern "C"` function wraps its body in `std::panic::catch_unwind`
//! so Rust panics never cross the FFI boundary. A panic inside an override
//! poisons the session: every later override falls through until the host
//! calls `rnd_clear_poison`. Null pointers and non-UTF-8 strings fall
//! through as well.
//!
//! # Strings
//!
//! String results point into a session-owned buffer that stays valid until
//! the next call on the same session. Lists are returned as one string with
//! entries separated by `'\n'`.
//!
//! # Re-entrancy
//!
//! A host ledger's `apply` callback may call back into the session. Balance
//! changes are handed to the host only after the session state has been
//! released, so nested calls see every change the outer call committed.
//! A call made while the state is held (from the `balance` callback) falls
//! through, and lifecycle functions return `RndResult::Busy`.

use std::cell::{Cell, RefCell};
use std::ffi::{CStr, CString, c_char, c_void};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::ptr;
use std::sync::Once;

use rnd_core::ledger::{CurrencyLedger, ScienceLedger, TransactionReason};
use rnd_core::situation::Situation;
use rnd_core::subject::{ScienceSubject, SubjectSource};
use rnd_data::{load_research_data, stock_data_dir};
use rnd_dispatch::{Dispatch, ResearchOverrides, ResearchSession, SaveRecords, SubjectRequest};
use rnd_tech_tree::{TechEvent, TechState, UnlockError};
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Result codes
// ---------------------------------------------------------------------------

/// Status codes returned by lifecycle and persistence functions.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RndResult {
    /// Success.
    Ok = 0,
    /// A required pointer argument was null.
    NullPointer = 1,
    /// A string argument was not valid UTF-8.
    InvalidString = 2,
    /// The research data directory could not be loaded.
    DataLoadError = 3,
    /// Encoding the save records failed.
    SerializeError = 4,
    /// The save records blob was truncated, foreign, or from another version.
    DeserializeError = 5,
    /// An internal panic was caught at the FFI boundary.
    InternalError = 6,
    /// The session is poisoned (a previous panic left it in an inconsistent state).
    Poisoned = 7,
    /// The session is already inside a call that holds its state.
    Busy = 8,
}

// ---------------------------------------------------------------------------
// FFI-safe value types
// ---------------------------------------------------------------------------

/// C-compatible tech node state.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RndTechState {
    Locked = 0,
    Available = 1,
    Researched = 2,
}

impl From<TechState> for RndTechState {
    fn from(state: TechState) -> Self {
        match state {
            TechState::Locked => RndTechState::Locked,
            TechState::Available => RndTechState::Available,
            TechState::Researched => RndTechState::Researched,
        }
    }
}

/// Outcome of an unlock request.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RndUnlockStatus {
    Unlocked = 0,
    UnknownNode = 1,
    AlreadyResearched = 2,
    PrereqsUnmet = 3,
    InsufficientFunds = 4,
}

impl From<&UnlockError> for RndUnlockStatus {
    fn from(err: &UnlockError) -> Self {
        match err {
            UnlockError::UnknownNode(_) => RndUnlockStatus::UnknownNode,
            UnlockError::AlreadyResearched(_) => RndUnlockStatus::AlreadyResearched,
            UnlockError::PrereqsUnmet { .. } => RndUnlockStatus::PrereqsUnmet,
            UnlockError::InsufficientFunds { .. } => RndUnlockStatus::InsufficientFunds,
        }
    }
}

/// C-compatible transaction reason, passed to the host ledger.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RndReason {
    ScienceTransmission = 0,
    VesselRecovery = 1,
    ContractReward = 2,
    TechResearch = 3,
    Cheating = 4,
    Other = 5,
}

impl From<TransactionReason> for RndReason {
    fn from(reason: TransactionReason) -> Self {
        match reason {
            TransactionReason::ScienceTransmission => RndReason::ScienceTransmission,
            TransactionReason::VesselRecovery => RndReason::VesselRecovery,
            TransactionReason::ContractReward => RndReason::ContractReward,
            TransactionReason::TechResearch => RndReason::TechResearch,
            TransactionReason::Cheating => RndReason::Cheating,
            TransactionReason::Other => RndReason::Other,
        }
    }
}

/// Reasons arrive from C as plain codes; unknown codes map to `Other`.
fn reason_from_code(code: u32) -> TransactionReason {
    match code {
        0 => TransactionReason::ScienceTransmission,
        1 => TransactionReason::VesselRecovery,
        2 => TransactionReason::ContractReward,
        3 => TransactionReason::TechResearch,
        4 => TransactionReason::Cheating,
        _ => TransactionReason::Other,
    }
}

/// A measurement location. `situation` indexes the canonical situation
/// order: 0 SrfLanded, 1 SrfSplashed, 2 FlyingLow, 3 FlyingHigh,
/// 4 InSpaceLow, 5 InSpaceHigh. `biome` and `display_biome` may be null.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RndSubjectRequest {
    pub experiment: *const c_char,
    pub situation: u32,
    pub body: *const c_char,
    pub biome: *const c_char,
    pub display_biome: *const c_char,
}

/// C-compatible view of a subject. `found` is false for unknown subjects,
/// in which case every other field is zero or null.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RndSubjectInfo {
    pub found: bool,
    pub id: *const c_char,
    pub title: *const c_char,
    pub collected: f64,
    pub science_cap: f64,
    pub difficulty: f64,
    pub base_value: f64,
    pub data_scale: f64,
}

impl Default for RndSubjectInfo {
    fn default() -> Self {
        Self {
            found: false,
            id: ptr::null(),
            title: ptr::null(),
            collected: 0.0,
            science_cap: 0.0,
            difficulty: 0.0,
            base_value: 0.0,
            data_scale: 0.0,
        }
    }
}

/// C-compatible tech event tag.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RndTechEventKind {
    NodeAvailable = 0,
    NodeResearched = 1,
    NodeReset = 2,
    RefreshRequested = 3,
}

/// C-compatible tech event. `node` is null for `RefreshRequested`; `cost`
/// is zero except for `NodeResearched`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RndTechEvent {
    pub kind: RndTechEventKind,
    pub node: *const c_char,
    pub cost: f64,
}

/// Result of polling tech events: a session-owned array and its length.
#[repr(C)]
#[derive(Debug)]
pub struct RndTechEventBuffer {
    /// Pointer to an array of `RndTechEvent`. Valid until the next call.
    pub events: *const RndTechEvent,
    pub count: u32,
}

/// A library-allocated byte buffer returned from `rnd_save_records`.
#[repr(C)]
#[derive(Debug)]
pub struct RndByteBuffer {
    /// Pointer to the data. Null on error.
    pub data: *mut u8,
    /// Length in bytes.
    pub len: usize,
}

// ---------------------------------------------------------------------------
// Host ledger
// ---------------------------------------------------------------------------

/// The host's science balance, reached through callbacks. `apply` receives
/// a signed amount: positive for credits, negative for debits. It runs
/// after the call that made the change has committed, and may call back
/// into the session.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RndHostLedger {
    pub user_data: *mut c_void,
    pub balance: Option<extern "C" fn(user_data: *mut c_void) -> f64>,
    pub apply: Option<extern "C" fn(user_data: *mut c_void, amount: f64, reason: RndReason)>,
}

#[derive(Debug, Clone, Copy)]
struct HostCallbacks {
    user_data: *mut c_void,
    balance: extern "C" fn(*mut c_void) -> f64,
    apply: extern "C" fn(*mut c_void, f64, RndReason),
}

/// Balance changes made during a call wait in `pending` until the call
/// releases the session; see [`RndSession::settle`].
#[derive(Debug, Clone)]
struct HostLedger {
    callbacks: HostCallbacks,
    pending: Vec<(f64, RndReason)>,
}

type Settlement = (HostCallbacks, Vec<(f64, RndReason)>);

/// Either the in-process balance or the host's.
#[derive(Debug, Clone)]
enum SessionLedger {
    Local(ScienceLedger),
    Host(HostLedger),
}

impl CurrencyLedger for SessionLedger {
    fn balance(&self) -> f64 {
        match self {
            SessionLedger::Local(ledger) => ledger.balance(),
            SessionLedger::Host(host) => {
                let settled = (host.callbacks.balance)(host.callbacks.user_data);
                settled + host.pending.iter().map(|(amount, _)| amount).sum::<f64>()
            }
        }
    }

    fn credit(&mut self, amount: f64, reason: TransactionReason) {
        match self {
            SessionLedger::Local(ledger) => ledger.credit(amount, reason),
            SessionLedger::Host(host) => host.pending.push((amount, reason.into())),
        }
    }

    fn debit(&mut self, amount: f64, reason: TransactionReason) {
        match self {
            SessionLedger::Local(ledger) => ledger.debit(amount, reason),
            SessionLedger::Host(host) => host.pending.push((-amount, reason.into())),
        }
    }
}

impl SessionLedger {
    fn take_pending(&mut self) -> Option<Settlement> {
        match self {
            SessionLedger::Host(host) if !host.pending.is_empty() => {
                Some((host.callbacks, std::mem::take(&mut host.pending)))
            }
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Opaque handle
// ---------------------------------------------------------------------------

/// Opaque session handle. Callers receive `*mut RndSession` from
/// `rnd_session_create` and pass it to all subsequent calls.
///
/// Calls only ever form shared references to the handle; the state is
/// reached through the `RefCell`, so a nested call from a host callback
/// finds it either released or visibly held.
pub struct RndSession {
    state: RefCell<SessionState>,
    poisoned: Cell<bool>,
    /// Host callbacks currently running for this session.
    depth: Cell<u32>,
}

struct SessionState {
    inner: ResearchSession<SessionLedger>,
    strings: Vec<CString>,
    events: Vec<RndTechEvent>,
}

impl RndSession {
    fn new(inner: ResearchSession<SessionLedger>) -> Self {
        Self {
            state: RefCell::new(SessionState {
                inner,
                strings: Vec::new(),
                events: Vec::new(),
            }),
            poisoned: Cell::new(false),
            depth: Cell::new(0),
        }
    }

    /// Run `f` with exclusive access to the state, then settle any host
    /// ledger changes it made. A panic poisons the session.
    fn enter<T>(&self, f: impl FnOnce(&mut SessionState) -> T) -> Result<T, RndResult> {
        if self.poisoned.get() {
            return Err(RndResult::Poisoned);
        }
        let Ok(mut state) = self.state.try_borrow_mut() else {
            tracing::debug!(target: "rnd", "session busy, nested call falls through");
            return Err(RndResult::Busy);
        };
        // Strings returned by an outer call stay valid while its callbacks run.
        let outermost = self.depth.get() == 0;
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            if outermost {
                state.strings.clear();
            }
            let value = f(&mut *state);
            (value, state.inner.ledger_mut().take_pending())
        }));
        drop(state);
        match outcome {
            Ok((value, pending)) => {
                self.settle(pending);
                Ok(value)
            }
            Err(_) => {
                self.poisoned.set(true);
                tracing::error!(target: "rnd", "panic in session call, session poisoned");
                Err(RndResult::InternalError)
            }
        }
    }

    /// Hand deferred balance changes to the host. The state is already
    /// released, so the callback may call back into the session.
    fn settle(&self, pending: Option<Settlement>) {
        let Some((host, adjustments)) = pending else {
            return;
        };
        self.depth.set(self.depth.get() + 1);
        for (amount, reason) in adjustments {
            (host.apply)(host.user_data, amount, reason);
        }
        self.depth.set(self.depth.get() - 1);
    }

    fn is_busy(&self) -> bool {
        self.depth.get() > 0 || self.state.try_borrow_mut().is_err()
    }
}

impl SessionState {
    fn overrides(&mut self) -> &mut dyn ResearchOverrides {
        &mut self.inner
    }

    /// Move `text` into the string buffer. The pointer stays valid until
    /// the buffer is cleared at the start of the next call.
    fn intern(&mut self, text: String) -> *const c_char {
        let c = c_string(text);
        let ptr = c.as_ptr();
        self.strings.push(c);
        ptr
    }

    fn subject_info(&mut self, subject: Option<ScienceSubject>) -> RndSubjectInfo {
        let Some(subject) = subject else {
            return RndSubjectInfo::default();
        };
        RndSubjectInfo {
            found: true,
            id: self.intern(subject.id.to_string()),
            title: self.intern(subject.title),
            collected: subject.collected,
            science_cap: subject.science_cap,
            difficulty: subject.difficulty,
            base_value: subject.base_value,
            data_scale: subject.data_scale,
        }
    }
}

/// Interior NULs cannot cross into C; they are dropped.
fn c_string(text: String) -> CString {
    CString::new(text).unwrap_or_else(|err| {
        let mut bytes = err.into_vec();
        bytes.retain(|b| *b != 0);
        CString::new(bytes).unwrap_or_default()
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Borrow a C string argument. Null or non-UTF-8 input yields `None`.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that outlives `'a`.
unsafe fn str_arg<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

/// # Safety
///
/// Every non-null string in `request` must be valid for `'a`.
unsafe fn request_arg<'a>(request: *const RndSubjectRequest) -> Option<SubjectRequest<'a>> {
    if request.is_null() {
        return None;
    }
    let request = unsafe { &*request };
    let situation = *Situation::ALL.get(usize::try_from(request.situation).ok()?)?;
    Some(SubjectRequest {
        experiment: unsafe { str_arg(request.experiment) }?,
        situation,
        body: unsafe { str_arg(request.body) }?,
        biome: unsafe { str_arg(request.biome) }.unwrap_or(""),
        display_biome: unsafe { str_arg(request.display_biome) }.unwrap_or(""),
    })
}

/// Run one override point against a live session. Null, poisoned and busy
/// sessions fall through; a panic poisons the session and falls through.
///
/// # Safety
///
/// `session` must be null or a live pointer from `rnd_session_create`.
unsafe fn run<T>(
    session: *mut RndSession,
    f: impl FnOnce(&mut SessionState) -> Dispatch<T>,
) -> Dispatch<T> {
    if session.is_null() {
        return Dispatch::Fallthrough;
    }
    // SAFETY: caller guarantees `session` was returned by rnd_session_create.
    let session = unsafe { &*session };
    session.enter(f).unwrap_or(Dispatch::Fallthrough)
}

/// Run a lifecycle or persistence function against a live session.
///
/// # Safety
///
/// `session` must be null or a live pointer from `rnd_session_create`.
unsafe fn with_state(
    session: *const RndSession,
    f: impl FnOnce(&mut SessionState) -> RndResult,
) -> RndResult {
    if session.is_null() {
        return RndResult::NullPointer;
    }
    // SAFETY: caller guarantees `session` was returned by rnd_session_create.
    let session = unsafe { &*session };
    session.enter(f).unwrap_or_else(|err| err)
}

/// Write an override's result through `out` and return the skip flag.
///
/// # Safety
///
/// `out` must be valid for writes when `dispatch` is an override.
unsafe fn emit<T>(dispatch: Dispatch<T>, out: *mut T) -> bool {
    match dispatch {
        Dispatch::Override(value) => {
            unsafe { out.write(value) };
            true
        }
        Dispatch::Fallthrough => false,
    }
}

/// Run a value-returning override point.
///
/// # Safety
///
/// As [`run`]; `out` must be null or valid for writes.
unsafe fn value_point<T>(
    session: *mut RndSession,
    out: *mut T,
    f: impl FnOnce(&mut dyn ResearchOverrides) -> Dispatch<T>,
) -> bool {
    if out.is_null() {
        return false;
    }
    unsafe { emit(run(session, |s| f(s.overrides())), out) }
}

/// Run a string-returning override point.
///
/// # Safety
///
/// As [`run`]; `out` must be null or valid for writes.
unsafe fn string_point(
    session: *mut RndSession,
    out: *mut *const c_char,
    f: impl FnOnce(&mut dyn ResearchOverrides) -> Dispatch<String>,
) -> bool {
    if out.is_null() {
        return false;
    }
    let dispatch = unsafe {
        run(session, |s| {
            let text = f(s.overrides());
            text.map(|text| s.intern(text))
        })
    };
    unsafe { emit(dispatch, out) }
}

/// Run a list-returning override point; entries are joined with `'\n'`.
///
/// # Safety
///
/// As [`string_point`].
unsafe fn list_point(
    session: *mut RndSession,
    out: *mut *const c_char,
    f: impl FnOnce(&mut dyn ResearchOverrides) -> Dispatch<Vec<String>>,
) -> bool {
    unsafe { string_point(session, out, |o| f(o).map(|items| items.join("\n"))) }
}

/// Run a subject-returning override point.
///
/// # Safety
///
/// As [`value_point`].
unsafe fn subject_point(
    session: *mut RndSession,
    out: *mut RndSubjectInfo,
    f: impl FnOnce(&mut dyn ResearchOverrides) -> Dispatch<Option<ScienceSubject>>,
) -> bool {
    if out.is_null() {
        return false;
    }
    let dispatch = unsafe {
        run(session, |s| {
            let subject = f(s.overrides());
            subject.map(|subject| s.subject_info(subject))
        })
    };
    unsafe { emit(dispatch, out) }
}

// ===========================================================================
// Extern "C" functions
// ===========================================================================

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

static LOGGING: Once = Once::new();

/// Install a `tracing` subscriber writing to stderr, filtered by the
/// `RND_LOG` environment variable (default `info`). Safe to call more than
/// once; only the first call has an effect.
#[unsafe(no_mangle)]
pub extern "C" fn rnd_init_logging() -> RndResult {
    match catch_unwind(|| {
        LOGGING.call_once(|| {
            let filter =
                EnvFilter::try_from_env("RND_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
            // A host that installed its own subscriber keeps it.
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .try_init();
        });
    }) {
        Ok(()) => RndResult::Ok,
        Err(_) => RndResult::InternalError,
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// # Safety
///
/// `data_dir` must be null or a NUL-terminated string. `out_session` must be
/// valid for writes.
unsafe fn create(
    data_dir: *const c_char,
    ledger: SessionLedger,
    out_session: *mut *mut RndSession,
) -> RndResult {
    if out_session.is_null() {
        return RndResult::NullPointer;
    }
    match catch_unwind(AssertUnwindSafe(|| {
        unsafe { *out_session = ptr::null_mut() };
        let dir = if data_dir.is_null() {
            stock_data_dir()
        } else {
            match unsafe { str_arg(data_dir) } {
                Some(dir) => PathBuf::from(dir),
                None => return RndResult::InvalidString,
            }
        };
        match load_research_data(&dir) {
            Ok(data) => {
                let session = RndSession::new(ResearchSession::new(data, ledger));
                unsafe { *out_session = Box::into_raw(Box::new(session)) };
                RndResult::Ok
            }
            Err(err) => {
                tracing::error!(target: "rnd", dir = %dir.display(), %err, "failed to load research data");
                RndResult::DataLoadError
            }
        }
    })) {
        Ok(result) => result,
        Err(_) => RndResult::InternalError,
    }
}

/// Start a session from the data directory at `data_dir` (null for the
/// stock data set), with an in-process science balance of `balance`. The
/// caller must eventually call `rnd_session_destroy`.
///
/// # Safety
///
/// `data_dir` must be null or a NUL-terminated string. `out_session` must be
/// a valid pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_session_create(
    data_dir: *const c_char,
    balance: f64,
    out_session: *mut *mut RndSession,
) -> RndResult {
    unsafe {
        create(
            data_dir,
            SessionLedger::Local(ScienceLedger::new(balance)),
            out_session,
        )
    }
}

/// As `rnd_session_create`, with the science balance owned by the host and
/// reached through `ledger`'s callbacks.
///
/// # Safety
///
/// As `rnd_session_create`. The callbacks and `user_data` must stay valid
/// until the session is destroyed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_session_create_with_host_ledger(
    data_dir: *const c_char,
    ledger: RndHostLedger,
    out_session: *mut *mut RndSession,
) -> RndResult {
    let (Some(balance), Some(apply)) = (ledger.balance, ledger.apply) else {
        return RndResult::NullPointer;
    };
    let host = HostLedger {
        callbacks: HostCallbacks {
            user_data: ledger.user_data,
            balance,
            apply,
        },
        pending: Vec::new(),
    };
    unsafe { create(data_dir, SessionLedger::Host(host), out_session) }
}

/// Destroy a session and free its memory. Returns `Busy`, and leaves the
/// session alive, when called from inside one of the session's callbacks.
///
/// # Safety
///
/// `session` must be a pointer returned by `rnd_session_create` that has not
/// yet been destroyed. After this call the pointer is invalid.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_session_destroy(session: *mut RndSession) -> RndResult {
    if session.is_null() {
        return RndResult::NullPointer;
    }
    if unsafe { &*session }.is_busy() {
        return RndResult::Busy;
    }
    match catch_unwind(AssertUnwindSafe(|| {
        // SAFETY: caller guarantees `session` was returned by rnd_session_create.
        let _ = unsafe { Box::from_raw(session) };
    })) {
        Ok(()) => RndResult::Ok,
        Err(_) => RndResult::InternalError,
    }
}

/// Forget all research progress in the session.
///
/// # Safety
///
/// `session` must be a valid session pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_session_reset(session: *mut RndSession) -> RndResult {
    unsafe {
        with_state(session, |state| {
            state.inner.reset();
            RndResult::Ok
        })
    }
}

/// Whether a previous panic poisoned the session.
///
/// # Safety
///
/// `session` must be null or a valid session pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_is_poisoned(session: *const RndSession) -> bool {
    if session.is_null() {
        return false;
    }
    unsafe { &*session }.poisoned.get()
}

/// Clear the poison flag so override points run again.
///
/// # Safety
///
/// `session` must be a valid session pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_clear_poison(session: *mut RndSession) -> RndResult {
    if session.is_null() {
        return RndResult::NullPointer;
    }
    unsafe { &*session }.poisoned.set(false);
    tracing::warn!(target: "rnd", "session poison cleared by host");
    RndResult::Ok
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Encode the session's research records. The caller must free the buffer
/// with `rnd_free_buffer`.
///
/// # Safety
///
/// `session` and `out_buffer` must be valid pointers.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_save_records(
    session: *const RndSession,
    out_buffer: *mut RndByteBuffer,
) -> RndResult {
    if out_buffer.is_null() {
        return RndResult::NullPointer;
    }
    unsafe {
        with_state(session, |state| match state.inner.save_records().encode() {
            Ok(data) => {
                let len = data.len();
                let mut boxed = data.into_boxed_slice();
                let ptr = boxed.as_mut_ptr();
                std::mem::forget(boxed);
                unsafe { *out_buffer = RndByteBuffer { data: ptr, len } };
                RndResult::Ok
            }
            Err(err) => {
                tracing::error!(target: "rnd", %err, "failed to encode research records");
                unsafe {
                    *out_buffer = RndByteBuffer {
                        data: ptr::null_mut(),
                        len: 0,
                    }
                };
                RndResult::SerializeError
            }
        })
    }
}

/// Restore research records saved by `rnd_save_records`. A rejected blob
/// leaves the session unchanged.
///
/// # Safety
///
/// `session` must be a valid session pointer. `data` must point to `len`
/// valid bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_restore_records(
    session: *mut RndSession,
    data: *const u8,
    len: usize,
) -> RndResult {
    if data.is_null() {
        return RndResult::NullPointer;
    }
    let bytes = unsafe { std::slice::from_raw_parts(data, len) };
    unsafe {
        with_state(session, |state| match SaveRecords::decode(bytes) {
            Ok(records) => {
                state.inner.restore_records(&records);
                RndResult::Ok
            }
            Err(err) => {
                tracing::warn!(target: "rnd", %err, "rejected research records");
                RndResult::DeserializeError
            }
        })
    }
}

/// Free a byte buffer returned by `rnd_save_records`.
///
/// # Safety
///
/// `buffer` must be a buffer originally returned by `rnd_save_records`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_free_buffer(buffer: RndByteBuffer) -> RndResult {
    if buffer.data.is_null() {
        return RndResult::Ok;
    }
    match catch_unwind(AssertUnwindSafe(|| {
        let _ = unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(buffer.data, buffer.len)) };
    })) {
        Ok(()) => RndResult::Ok,
        Err(_) => RndResult::InternalError,
    }
}

// ---------------------------------------------------------------------------
// Tech events
// ---------------------------------------------------------------------------

/// Drain tech tree events raised since the last poll. The buffer is valid
/// until the next call on the session.
///
/// # Safety
///
/// `session` and `out_buffer` must be valid pointers.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_poll_tech_events(
    session: *mut RndSession,
    out_buffer: *mut RndTechEventBuffer,
) -> RndResult {
    if out_buffer.is_null() {
        return RndResult::NullPointer;
    }
    unsafe { with_state(session, |state| poll_tech_events(state, out_buffer)) }
}

/// # Safety
///
/// `out_buffer` must be valid for writes.
unsafe fn poll_tech_events(
    state: &mut SessionState,
    out_buffer: *mut RndTechEventBuffer,
) -> RndResult {
    let drained = state.inner.drain_tech_events();
    let mut events = Vec::with_capacity(drained.len());
    for event in drained {
        let (kind, node, cost) = match event {
            TechEvent::NodeAvailable { node } => (RndTechEventKind::NodeAvailable, Some(node), 0.0),
            TechEvent::NodeResearched { node, cost } => {
                (RndTechEventKind::NodeResearched, Some(node), cost)
            }
            TechEvent::NodeReset { node } => (RndTechEventKind::NodeReset, Some(node), 0.0),
            TechEvent::RefreshRequested => (RndTechEventKind::RefreshRequested, None, 0.0),
        };
        let node = node.map_or(ptr::null(), |n| state.intern(n.to_string()));
        events.push(RndTechEvent { kind, node, cost });
    }
    state.events = events;
    unsafe {
        *out_buffer = RndTechEventBuffer {
            events: state.events.as_ptr(),
            count: u32::try_from(state.events.len()).unwrap_or(u32::MAX),
        }
    };
    RndResult::Ok
}

// ---------------------------------------------------------------------------
// Override points: experimental parts
// ---------------------------------------------------------------------------

/// # Safety
///
/// `session` must be null or valid; `part` must be null or NUL-terminated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_add_experimental_part(
    session: *mut RndSession,
    part: *const c_char,
) -> bool {
    let Some(part) = (unsafe { str_arg(part) }) else {
        return false;
    };
    unsafe { run(session, |s| s.overrides().add_experimental_part(part)) }.should_skip_default()
}

/// # Safety
///
/// `session` must be null or valid; `part` must be null or NUL-terminated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_remove_experimental_part(
    session: *mut RndSession,
    part: *const c_char,
) -> bool {
    let Some(part) = (unsafe { str_arg(part) }) else {
        return false;
    };
    unsafe { run(session, |s| s.overrides().remove_experimental_part(part)) }
        .should_skip_default()
}

/// # Safety
///
/// `session` must be null or valid; `part` must be null or NUL-terminated;
/// `out` must be null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_part_experimental(
    session: *mut RndSession,
    part: *const c_char,
    out: *mut bool,
) -> bool {
    let Some(part) = (unsafe { str_arg(part) }) else {
        return false;
    };
    unsafe { value_point(session, out, |o| o.part_experimental(part)) }
}

/// # Safety
///
/// As `rnd_part_experimental`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_part_model_purchased(
    session: *mut RndSession,
    part: *const c_char,
    out: *mut bool,
) -> bool {
    let Some(part) = (unsafe { str_arg(part) }) else {
        return false;
    };
    unsafe { value_point(session, out, |o| o.part_model_purchased(part)) }
}

// ---------------------------------------------------------------------------
// Override points: tech tree
// ---------------------------------------------------------------------------

/// # Safety
///
/// As `rnd_part_experimental`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_part_tech_available(
    session: *mut RndSession,
    part: *const c_char,
    out: *mut bool,
) -> bool {
    let Some(part) = (unsafe { str_arg(part) }) else {
        return false;
    };
    unsafe { value_point(session, out, |o| o.part_tech_available(part)) }
}

/// `objectives` points to `count` strings. Any null or non-UTF-8 entry
/// falls through.
///
/// # Safety
///
/// `objectives` must point to `count` string pointers; `out` must be null
/// or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_researched_valid_contract_objectives(
    session: *mut RndSession,
    objectives: *const *const c_char,
    count: usize,
    out: *mut bool,
) -> bool {
    if objectives.is_null() && count > 0 {
        return false;
    }
    let raw: &[*const c_char] = if count == 0 {
        &[][..]
    } else {
        unsafe { std::slice::from_raw_parts(objectives, count) }
    };
    let mut owned = Vec::with_capacity(count);
    for ptr in raw {
        let Some(objective) = (unsafe { str_arg(*ptr) }) else {
            return false;
        };
        owned.push(objective.to_string());
    }
    unsafe {
        value_point(session, out, |o| {
            o.researched_valid_contract_objectives(&owned)
        })
    }
}

/// # Safety
///
/// `session` must be null or valid; `out` must be null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_can_afford(
    session: *mut RndSession,
    amount: f64,
    out: *mut bool,
) -> bool {
    unsafe { value_point(session, out, |o| o.can_afford(amount)) }
}

/// # Safety
///
/// `session` must be null or valid; `node` must be null or NUL-terminated;
/// `out` must be null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_technology_state(
    session: *mut RndSession,
    node: *const c_char,
    out: *mut RndTechState,
) -> bool {
    let Some(node) = (unsafe { str_arg(node) }) else {
        return false;
    };
    unsafe { value_point(session, out, |o| o.technology_state(node).map(Into::into)) }
}

/// # Safety
///
/// As `rnd_technology_state`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_technology_title(
    session: *mut RndSession,
    node: *const c_char,
    out: *mut *const c_char,
) -> bool {
    let Some(node) = (unsafe { str_arg(node) }) else {
        return false;
    };
    unsafe { string_point(session, out, |o| o.technology_title(node)) }
}

/// Research `node`, paying its cost from the session's ledger.
///
/// # Safety
///
/// As `rnd_technology_state`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_unlock_technology(
    session: *mut RndSession,
    node: *const c_char,
    out: *mut RndUnlockStatus,
) -> bool {
    let Some(node) = (unsafe { str_arg(node) }) else {
        return false;
    };
    unsafe {
        value_point(session, out, |o| {
            o.unlock_technology(node).map(|result| match &result {
                Ok(_) => RndUnlockStatus::Unlocked,
                Err(err) => RndUnlockStatus::from(err),
            })
        })
    }
}

/// # Safety
///
/// `session` must be null or valid.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_refresh_tech_tree_ui(session: *mut RndSession) -> bool {
    unsafe { run(session, |s| s.overrides().refresh_tech_tree_ui()) }.should_skip_default()
}

// ---------------------------------------------------------------------------
// Override points: biomes and situations
// ---------------------------------------------------------------------------

/// # Safety
///
/// `session` must be null or valid; `body` must be null or NUL-terminated;
/// `out` must be null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_biome_tags(
    session: *mut RndSession,
    body: *const c_char,
    include_mini_biomes: bool,
    out: *mut *const c_char,
) -> bool {
    let Some(body) = (unsafe { str_arg(body) }) else {
        return false;
    };
    unsafe { list_point(session, out, |o| o.biome_tags(body, include_mini_biomes)) }
}

/// # Safety
///
/// As `rnd_biome_tags`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_biome_tags_localized(
    session: *mut RndSession,
    body: *const c_char,
    include_mini_biomes: bool,
    out: *mut *const c_char,
) -> bool {
    let Some(body) = (unsafe { str_arg(body) }) else {
        return false;
    };
    unsafe {
        list_point(session, out, |o| {
            o.biome_tags_localized(body, include_mini_biomes)
        })
    }
}

/// # Safety
///
/// As `rnd_biome_tags`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_mini_biome_tags(
    session: *mut RndSession,
    body: *const c_char,
    out: *mut *const c_char,
) -> bool {
    let Some(body) = (unsafe { str_arg(body) }) else {
        return false;
    };
    unsafe { list_point(session, out, |o| o.mini_biome_tags(body)) }
}

/// # Safety
///
/// As `rnd_biome_tags`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_mini_biome_tags_localized(
    session: *mut RndSession,
    body: *const c_char,
    out: *mut *const c_char,
) -> bool {
    let Some(body) = (unsafe { str_arg(body) }) else {
        return false;
    };
    unsafe { list_point(session, out, |o| o.mini_biome_tags_localized(body)) }
}

/// # Safety
///
/// As `rnd_biome_tags`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_mini_biome_name_by_science_id(
    session: *mut RndSession,
    tag: *const c_char,
    formatted: bool,
    out: *mut *const c_char,
) -> bool {
    let Some(tag) = (unsafe { str_arg(tag) }) else {
        return false;
    };
    unsafe {
        string_point(session, out, |o| {
            o.mini_biome_name_by_science_id(tag, formatted)
        })
    }
}

/// # Safety
///
/// As `rnd_biome_tags`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_mini_biome_name_by_unity_tag(
    session: *mut RndSession,
    unity_tag: *const c_char,
    formatted: bool,
    out: *mut *const c_char,
) -> bool {
    let Some(unity_tag) = (unsafe { str_arg(unity_tag) }) else {
        return false;
    };
    unsafe {
        string_point(session, out, |o| {
            o.mini_biome_name_by_unity_tag(unity_tag, formatted)
        })
    }
}

/// # Safety
///
/// `session` must be null or valid; `out` must be null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_situation_tags(
    session: *mut RndSession,
    out: *mut *const c_char,
) -> bool {
    unsafe { list_point(session, out, |o| o.situation_tags()) }
}

/// # Safety
///
/// `session` must be null or valid; `out` must be null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_situation_tag_descriptions(
    session: *mut RndSession,
    out: *mut *const c_char,
) -> bool {
    unsafe { list_point(session, out, |o| o.situation_tag_descriptions()) }
}

// ---------------------------------------------------------------------------
// Override points: experiments and subjects
// ---------------------------------------------------------------------------

/// Title of an experiment; empty for unknown experiments.
///
/// # Safety
///
/// `session` must be null or valid; `id` must be null or NUL-terminated;
/// `out` must be null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_experiment_title(
    session: *mut RndSession,
    id: *const c_char,
    out: *mut *const c_char,
) -> bool {
    let Some(id) = (unsafe { str_arg(id) }) else {
        return false;
    };
    unsafe {
        string_point(session, out, |o| {
            o.experiment(id)
                .map(|experiment| experiment.map(|e| e.title).unwrap_or_default())
        })
    }
}

/// # Safety
///
/// `session` must be null or valid; `out` must be null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_experiment_ids(
    session: *mut RndSession,
    out: *mut *const c_char,
) -> bool {
    unsafe { list_point(session, out, |o| o.experiment_ids()) }
}

/// The subject for a measurement, created on first use.
///
/// # Safety
///
/// `session` must be null or valid; `request` must be null or point to a
/// request whose strings are null or NUL-terminated; `out` must be null or
/// writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_experiment_subject(
    session: *mut RndSession,
    request: *const RndSubjectRequest,
    out: *mut RndSubjectInfo,
) -> bool {
    let Some(request) = (unsafe { request_arg(request) }) else {
        return false;
    };
    unsafe { subject_point(session, out, |o| o.experiment_subject(&request)) }
}

/// As `rnd_experiment_subject`, for a measurement of one source object.
///
/// # Safety
///
/// As `rnd_experiment_subject`; `source_uid` and `source_title` must be null
/// or NUL-terminated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_experiment_subject_with_source(
    session: *mut RndSession,
    request: *const RndSubjectRequest,
    source_uid: *const c_char,
    source_title: *const c_char,
    out: *mut RndSubjectInfo,
) -> bool {
    let Some(request) = (unsafe { request_arg(request) }) else {
        return false;
    };
    let Some(uid) = (unsafe { str_arg(source_uid) }) else {
        return false;
    };
    let source = SubjectSource {
        uid: uid.to_string(),
        title: unsafe { str_arg(source_title) }.unwrap_or(uid).to_string(),
    };
    unsafe {
        subject_point(session, out, |o| {
            o.experiment_subject_with_source(&request, &source)
        })
    }
}

/// # Safety
///
/// `session` must be null or valid; `id` must be null or NUL-terminated;
/// `out` must be null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_subject_by_id(
    session: *mut RndSession,
    id: *const c_char,
    out: *mut RndSubjectInfo,
) -> bool {
    let Some(id) = (unsafe { str_arg(id) }) else {
        return false;
    };
    unsafe { subject_point(session, out, |o| o.subject_by_id(id)) }
}

/// Ids of every subject created so far.
///
/// # Safety
///
/// `session` must be null or valid; `out` must be null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_subject_ids(
    session: *mut RndSession,
    out: *mut *const c_char,
) -> bool {
    unsafe {
        list_point(session, out, |o| {
            o.subjects()
                .map(|subjects| subjects.into_iter().map(|s| s.id.to_string()).collect())
        })
    }
}

/// # Safety
///
/// `session` must be null or valid; `subject_id` must be null or
/// NUL-terminated; `out` must be null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_results(
    session: *mut RndSession,
    subject_id: *const c_char,
    out: *mut *const c_char,
) -> bool {
    let Some(subject_id) = (unsafe { str_arg(subject_id) }) else {
        return false;
    };
    unsafe { string_point(session, out, |o| o.results(subject_id)) }
}

// ---------------------------------------------------------------------------
// Override points: values
// ---------------------------------------------------------------------------

/// # Safety
///
/// `session` must be null or valid; `subject_id` must be null or
/// NUL-terminated; `out` must be null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_reference_data_value(
    session: *mut RndSession,
    amount: f64,
    subject_id: *const c_char,
    out: *mut f64,
) -> bool {
    let Some(subject_id) = (unsafe { str_arg(subject_id) }) else {
        return false;
    };
    unsafe { value_point(session, out, |o| o.reference_data_value(amount, subject_id)) }
}

/// # Safety
///
/// As `rnd_reference_data_value`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_science_value(
    session: *mut RndSession,
    amount: f64,
    subject_id: *const c_char,
    transmission: f64,
    out: *mut f64,
) -> bool {
    let Some(subject_id) = (unsafe { str_arg(subject_id) }) else {
        return false;
    };
    unsafe {
        value_point(session, out, |o| {
            o.science_value(amount, subject_id, transmission)
        })
    }
}

/// # Safety
///
/// As `rnd_reference_data_value`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_next_science_value(
    session: *mut RndSession,
    amount: f64,
    subject_id: *const c_char,
    transmission: f64,
    out: *mut f64,
) -> bool {
    let Some(subject_id) = (unsafe { str_arg(subject_id) }) else {
        return false;
    };
    unsafe {
        value_point(session, out, |o| {
            o.next_science_value(amount, subject_id, transmission)
        })
    }
}

/// # Safety
///
/// As `rnd_reference_data_value`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_subject_value(
    session: *mut RndSession,
    raw: f64,
    subject_id: *const c_char,
    out: *mut f64,
) -> bool {
    let Some(subject_id) = (unsafe { str_arg(subject_id) }) else {
        return false;
    };
    unsafe { value_point(session, out, |o| o.subject_value(raw, subject_id)) }
}

/// Commit a measurement and credit the ledger; `out` receives the amount
/// credited.
///
/// # Safety
///
/// As `rnd_reference_data_value`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_submit_science_data(
    session: *mut RndSession,
    amount: f64,
    subject_id: *const c_char,
    transmission: f64,
    out: *mut f64,
) -> bool {
    let Some(subject_id) = (unsafe { str_arg(subject_id) }) else {
        return false;
    };
    unsafe {
        value_point(session, out, |o| {
            o.submit_science_data(amount, subject_id, transmission)
        })
    }
}

// ---------------------------------------------------------------------------
// Override points: reports
// ---------------------------------------------------------------------------

/// # Safety
///
/// `session` must be null or valid; `out` must be null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_count_universal_science(
    session: *mut RndSession,
    out: *mut *const c_char,
) -> bool {
    unsafe { string_point(session, out, |o| o.count_universal_science()) }
}

/// # Safety
///
/// `session` must be null or valid; `out` must be null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_check_for_missing_parts(
    session: *mut RndSession,
    out: *mut *const c_char,
) -> bool {
    unsafe { string_point(session, out, |o| o.check_for_missing_parts()) }
}

/// # Safety
///
/// `session` must be null or valid; `out` must be null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_part_assignment_summary(
    session: *mut RndSession,
    out: *mut *const c_char,
) -> bool {
    unsafe { string_point(session, out, |o| o.part_assignment_summary()) }
}

/// `reason` is an `RndReason` code; unknown codes are reported as `Other`.
///
/// # Safety
///
/// `session` must be null or valid; `out` must be null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rnd_science_transmission_reward_string(
    session: *mut RndSession,
    amount: f64,
    reason: u32,
    out: *mut *const c_char,
) -> bool {
    let reason = reason_from_code(reason);
    unsafe {
        string_point(session, out, |o| {
            o.science_transmission_reward_string(amount, reason)
        })
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn create_stock(balance: f64) -> *mut RndSession {
        let mut session = ptr::null_mut();
        let result = unsafe { rnd_session_create(ptr::null(), balance, &mut session) };
        assert_eq!(result, RndResult::Ok);
        assert!(!session.is_null());
        session
    }

    fn read(ptr: *const c_char) -> String {
        assert!(!ptr.is_null());
        unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_string()
    }

    fn shores_request(experiment: &CStr) -> RndSubjectRequest {
        RndSubjectRequest {
            experiment: experiment.as_ptr(),
            situation: 0,
            body: c"Kerbin".as_ptr(),
            biome: c"Shores".as_ptr(),
            display_biome: ptr::null(),
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    #[test]
    fn create_and_destroy() {
        let session = create_stock(0.0);
        assert_eq!(unsafe { rnd_session_destroy(session) }, RndResult::Ok);
    }

    #[test]
    fn create_from_missing_dir_fails() {
        let mut session = ptr::null_mut();
        let result = unsafe {
            rnd_session_create(c"/nonexistent/rnd/data".as_ptr(), 0.0, &mut session)
        };
        assert_eq!(result, RndResult::DataLoadError);
        assert!(session.is_null());
    }

    #[test]
    fn null_pointers() {
        assert_eq!(
            unsafe { rnd_session_create(ptr::null(), 0.0, ptr::null_mut()) },
            RndResult::NullPointer
        );
        assert_eq!(unsafe { rnd_session_destroy(ptr::null_mut()) }, RndResult::NullPointer);
        assert!(!unsafe { rnd_is_poisoned(ptr::null()) });

        let mut out = false;
        assert!(!unsafe { rnd_part_experimental(ptr::null_mut(), c"mk1pod".as_ptr(), &mut out) });

        let session = create_stock(0.0);
        assert!(!unsafe { rnd_part_experimental(session, ptr::null(), &mut out) });
        assert!(!unsafe { rnd_part_experimental(session, c"mk1pod".as_ptr(), ptr::null_mut()) });
        unsafe { rnd_session_destroy(session) };
    }

    #[test]
    fn init_logging_is_idempotent() {
        assert_eq!(rnd_init_logging(), RndResult::Ok);
        assert_eq!(rnd_init_logging(), RndResult::Ok);
    }

    // -----------------------------------------------------------------------
    // Override points
    // -----------------------------------------------------------------------

    #[test]
    fn submit_then_cap_reached() {
        let session = create_stock(0.0);
        let request = shores_request(c"evaReport");
        let mut info = RndSubjectInfo::default();
        assert!(unsafe { rnd_experiment_subject(session, &request, &mut info) });
        assert!(info.found);
        let id = CString::new(read(info.id)).unwrap();
        assert_eq!(id.to_str().unwrap(), "evaReport@KerbinSrfLandedShores");
        let cap = info.science_cap;

        let mut credited = -1.0;
        assert!(unsafe { rnd_submit_science_data(session, 1.0, id.as_ptr(), 1.0, &mut credited) });
        assert!((credited - cap).abs() < 1e-9);
        assert!(unsafe { rnd_submit_science_data(session, 1.0, id.as_ptr(), 1.0, &mut credited) });
        assert_eq!(credited, 0.0);

        let mut next = -1.0;
        assert!(unsafe { rnd_next_science_value(session, 1.0, id.as_ptr(), 1.0, &mut next) });
        assert_eq!(next, 0.0);

        let mut text = ptr::null();
        assert!(unsafe { rnd_results(session, id.as_ptr(), &mut text) });
        assert_eq!(read(text), "The waves lap gently at your boots.");
        unsafe { rnd_session_destroy(session) };
    }

    #[test]
    fn experimental_marks_are_counted() {
        let session = create_stock(0.0);
        let part = c"mk1pod".as_ptr();
        assert!(unsafe { rnd_add_experimental_part(session, part) });
        assert!(unsafe { rnd_add_experimental_part(session, part) });
        let mut flagged = false;
        for expected in [true, false, false] {
            assert!(unsafe { rnd_remove_experimental_part(session, part) });
            assert!(unsafe { rnd_part_experimental(session, part, &mut flagged) });
            assert_eq!(flagged, expected);
        }
        assert!(!flagged);
        unsafe { rnd_session_destroy(session) };
    }

    #[test]
    fn unlock_statuses() {
        let session = create_stock(5.0);
        let mut status = RndUnlockStatus::Unlocked;
        assert!(unsafe { rnd_unlock_technology(session, c"basicRocketry".as_ptr(), &mut status) });
        assert_eq!(status, RndUnlockStatus::PrereqsUnmet);

        assert!(unsafe { rnd_unlock_technology(session, c"start".as_ptr(), &mut status) });
        assert_eq!(status, RndUnlockStatus::Unlocked);
        let mut state = RndTechState::Locked;
        assert!(unsafe { rnd_technology_state(session, c"basicRocketry".as_ptr(), &mut state) });
        assert_eq!(state, RndTechState::Available);

        assert!(unsafe { rnd_unlock_technology(session, c"start".as_ptr(), &mut status) });
        assert_eq!(status, RndUnlockStatus::AlreadyResearched);
        assert!(unsafe { rnd_unlock_technology(session, c"ghost".as_ptr(), &mut status) });
        assert_eq!(status, RndUnlockStatus::UnknownNode);

        let mut title = ptr::null();
        assert!(unsafe { rnd_technology_title(session, c"basicRocketry".as_ptr(), &mut title) });
        assert_eq!(read(title), "Basic Rocketry");
        unsafe { rnd_session_destroy(session) };
    }

    #[test]
    fn tech_events_are_polled() {
        let session = create_stock(0.0);
        let mut status = RndUnlockStatus::UnknownNode;
        unsafe { rnd_unlock_technology(session, c"start".as_ptr(), &mut status) };
        assert!(unsafe { rnd_refresh_tech_tree_ui(session) });

        let mut buffer = RndTechEventBuffer {
            events: ptr::null(),
            count: 0,
        };
        assert_eq!(unsafe { rnd_poll_tech_events(session, &mut buffer) }, RndResult::Ok);
        let events = unsafe { std::slice::from_raw_parts(buffer.events, buffer.count as usize) };
        assert!(events.iter().any(|e| e.kind == RndTechEventKind::NodeResearched
            && read(e.node) == "start"));
        assert_eq!(
            events.last().map(|e| e.kind),
            Some(RndTechEventKind::RefreshRequested)
        );

        assert_eq!(unsafe { rnd_poll_tech_events(session, &mut buffer) }, RndResult::Ok);
        assert_eq!(buffer.count, 0);
        unsafe { rnd_session_destroy(session) };
    }

    #[test]
    fn lists_are_newline_separated() {
        let session = create_stock(0.0);
        let mut out = ptr::null();
        assert!(unsafe { rnd_situation_tags(session, &mut out) });
        assert_eq!(
            read(out),
            "SrfLanded\nSrfSplashed\nFlyingLow\nFlyingHigh\nInSpaceLow\nInSpaceHigh"
        );
        assert!(unsafe { rnd_biome_tags(session, c"Kerbin".as_ptr(), false, &mut out) });
        assert!(read(out).starts_with("Water\nShores\n"));
        assert!(unsafe { rnd_experiment_ids(session, &mut out) });
        assert!(read(out).contains("evaReport"));
        unsafe { rnd_session_destroy(session) };
    }

    #[test]
    fn contract_objectives_from_c_array() {
        let session = create_stock(0.0);
        let objectives = [c"CommandPod".as_ptr()];
        let mut out = true;
        assert!(unsafe {
            rnd_researched_valid_contract_objectives(session, objectives.as_ptr(), 1, &mut out)
        });
        assert!(!out);

        let mut status = RndUnlockStatus::UnknownNode;
        unsafe { rnd_unlock_technology(session, c"start".as_ptr(), &mut status) };
        assert!(unsafe {
            rnd_researched_valid_contract_objectives(session, objectives.as_ptr(), 1, &mut out)
        });
        assert!(out);
        unsafe { rnd_session_destroy(session) };
    }

    #[test]
    fn reward_string_with_reason_code() {
        let session = create_stock(0.0);
        let mut out = ptr::null();
        assert!(unsafe { rnd_science_transmission_reward_string(session, 5.0, 0, &mut out) });
        assert_eq!(read(out), "+5.0 Science (Science Transmission)");
        assert!(unsafe { rnd_science_transmission_reward_string(session, 1.0, 99, &mut out) });
        assert_eq!(read(out), "+1.0 Science (Other)");
        unsafe { rnd_session_destroy(session) };
    }

    // -----------------------------------------------------------------------
    // Host ledger
    // -----------------------------------------------------------------------

    extern "C" fn host_balance(user_data: *mut c_void) -> f64 {
        unsafe { *(user_data as *const f64) }
    }

    extern "C" fn host_apply(user_data: *mut c_void, amount: f64, _reason: RndReason) {
        unsafe { *(user_data as *mut f64) += amount };
    }

    #[test]
    fn host_ledger_receives_credits_and_debits() {
        let mut balance: f64 = 0.0;
        let ledger = RndHostLedger {
            user_data: (&mut balance as *mut f64).cast(),
            balance: Some(host_balance),
            apply: Some(host_apply),
        };
        let mut session = ptr::null_mut();
        assert_eq!(
            unsafe { rnd_session_create_with_host_ledger(ptr::null(), ledger, &mut session) },
            RndResult::Ok
        );

        let request = shores_request(c"crewReport");
        let mut info = RndSubjectInfo::default();
        assert!(unsafe { rnd_experiment_subject(session, &request, &mut info) });
        let id = CString::new(read(info.id)).unwrap();
        let mut credited = 0.0;
        unsafe { rnd_submit_science_data(session, 1.0, id.as_ptr(), 1.0, &mut credited) };
        assert!(credited > 0.0);
        assert!((balance - credited).abs() < 1e-9);

        let mut status = RndUnlockStatus::UnknownNode;
        unsafe { rnd_unlock_technology(session, c"start".as_ptr(), &mut status) };
        assert_eq!(status, RndUnlockStatus::Unlocked);
        unsafe { rnd_session_destroy(session) };
    }

    #[test]
    fn host_ledger_requires_callbacks() {
        let ledger = RndHostLedger {
            user_data: ptr::null_mut(),
            balance: None,
            apply: None,
        };
        let mut session = ptr::null_mut();
        assert_eq!(
            unsafe { rnd_session_create_with_host_ledger(ptr::null(), ledger, &mut session) },
            RndResult::NullPointer
        );
    }

    // -----------------------------------------------------------------------
    // Re-entrant host callbacks
    // -----------------------------------------------------------------------

    /// Host state for callbacks that call back into the session. Always
    /// reached through the raw pointer handed out as `user_data`.
    struct Reentrant {
        balance: f64,
        session: *mut RndSession,
        subject: CString,
        debits: u32,
        nested_unlock: Option<(bool, RndUnlockStatus)>,
        nested_value: Option<(bool, f64)>,
        nested_collected: Option<f64>,
        nested_afford: Option<bool>,
    }

    extern "C" fn reentrant_balance(user_data: *mut c_void) -> f64 {
        let host = user_data.cast::<Reentrant>();
        unsafe {
            if (*host).nested_afford.is_none() {
                let mut out = false;
                let skipped = rnd_can_afford((*host).session, 0.0, &mut out);
                (*host).nested_afford = Some(skipped);
            }
            (*host).balance
        }
    }

    extern "C" fn reentrant_apply(user_data: *mut c_void, amount: f64, reason: RndReason) {
        let host = user_data.cast::<Reentrant>();
        unsafe {
            (*host).balance += amount;
            let session = (*host).session;
            match reason {
                RndReason::TechResearch => {
                    (*host).debits += 1;
                    if (*host).nested_unlock.is_none() {
                        let mut status = RndUnlockStatus::Unlocked;
                        let skipped =
                            rnd_unlock_technology(session, c"basicRocketry".as_ptr(), &mut status);
                        (*host).nested_unlock = Some((skipped, status));
                    }
                }
                RndReason::ScienceTransmission if (*host).nested_value.is_none() => {
                    let subject = (*host).subject.as_ptr();
                    let mut next = -1.0;
                    let skipped = rnd_next_science_value(session, 1.0, subject, 1.0, &mut next);
                    (*host).nested_value = Some((skipped, next));
                    let mut info = RndSubjectInfo::default();
                    rnd_subject_by_id(session, subject, &mut info);
                    (*host).nested_collected = Some(info.collected);
                }
                _ => {}
            }
        }
    }

    fn create_reentrant(balance: f64, subject: &str) -> *mut Reentrant {
        let host = Box::into_raw(Box::new(Reentrant {
            balance,
            session: ptr::null_mut(),
            subject: CString::new(subject).unwrap(),
            debits: 0,
            nested_unlock: None,
            nested_value: None,
            nested_collected: None,
            nested_afford: None,
        }));
        let ledger = RndHostLedger {
            user_data: host.cast(),
            balance: Some(reentrant_balance),
            apply: Some(reentrant_apply),
        };
        let mut session = ptr::null_mut();
        assert_eq!(
            unsafe { rnd_session_create_with_host_ledger(ptr::null(), ledger, &mut session) },
            RndResult::Ok
        );
        unsafe { (*host).session = session };
        host
    }

    fn destroy_reentrant(host: *mut Reentrant) {
        let host = unsafe { Box::from_raw(host) };
        assert_eq!(unsafe { rnd_session_destroy(host.session) }, RndResult::Ok);
    }

    #[test]
    fn nested_unlock_from_debit_is_charged_once() {
        let host = create_reentrant(100.0, "");
        let session = unsafe { (*host).session };
        let mut status = RndUnlockStatus::UnknownNode;
        assert!(unsafe { rnd_unlock_technology(session, c"start".as_ptr(), &mut status) });
        assert!(unsafe { rnd_unlock_technology(session, c"basicRocketry".as_ptr(), &mut status) });
        assert_eq!(status, RndUnlockStatus::Unlocked);

        let host_ref = unsafe { &*host };
        assert_eq!(
            host_ref.nested_unlock,
            Some((true, RndUnlockStatus::AlreadyResearched))
        );
        assert_eq!(host_ref.debits, 1);
        assert_eq!(host_ref.balance, 95.0);
        destroy_reentrant(host);
    }

    #[test]
    fn nested_preview_from_credit_sees_committed_total() {
        let host = create_reentrant(0.0, "evaReport@KerbinSrfLandedShores");
        let session = unsafe { (*host).session };
        let request = shores_request(c"evaReport");
        let mut info = RndSubjectInfo::default();
        assert!(unsafe { rnd_experiment_subject(session, &request, &mut info) });

        let subject = unsafe { (*host).subject.as_ptr() };
        let mut credited = 0.0;
        assert!(unsafe { rnd_submit_science_data(session, 1.0, subject, 1.0, &mut credited) });
        assert!(credited > 0.0);

        let host_ref = unsafe { &*host };
        assert_eq!(host_ref.nested_value, Some((true, 0.0)));
        let collected = host_ref.nested_collected.unwrap();
        assert!((collected - credited).abs() < 1e-9);
        assert!((host_ref.balance - credited).abs() < 1e-9);
        destroy_reentrant(host);
    }

    #[test]
    fn call_while_state_held_falls_through() {
        let host = create_reentrant(10.0, "");
        let session = unsafe { (*host).session };
        let mut out = false;
        assert!(unsafe { rnd_can_afford(session, 5.0, &mut out) });
        assert!(out);
        // The balance callback ran inside the outer call.
        assert_eq!(unsafe { (*host).nested_afford }, Some(false));
        assert!(!unsafe { rnd_is_poisoned(session) });
        destroy_reentrant(host);
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    #[test]
    fn save_and_restore_records() {
        let session = create_stock(10.0);
        let mut status = RndUnlockStatus::UnknownNode;
        unsafe { rnd_unlock_technology(session, c"start".as_ptr(), &mut status) };
        unsafe { rnd_add_experimental_part(session, c"mk1pod".as_ptr()) };

        let mut buffer = RndByteBuffer {
            data: ptr::null_mut(),
            len: 0,
        };
        assert_eq!(unsafe { rnd_save_records(session, &mut buffer) }, RndResult::Ok);
        assert!(!buffer.data.is_null());

        let fresh = create_stock(0.0);
        assert_eq!(
            unsafe { rnd_restore_records(fresh, buffer.data, buffer.len) },
            RndResult::Ok
        );
        let mut state = RndTechState::Locked;
        unsafe { rnd_technology_state(fresh, c"start".as_ptr(), &mut state) };
        assert_eq!(state, RndTechState::Researched);
        let mut flagged = false;
        unsafe { rnd_part_experimental(fresh, c"mk1pod".as_ptr(), &mut flagged) };
        assert!(flagged);

        assert_eq!(unsafe { rnd_free_buffer(buffer) }, RndResult::Ok);
        unsafe { rnd_session_destroy(session) };
        unsafe { rnd_session_destroy(fresh) };
    }

    #[test]
    fn restore_rejects_garbage() {
        let session = create_stock(0.0);
        let garbage = [0xFFu8; 16];
        assert_eq!(
            unsafe { rnd_restore_records(session, garbage.as_ptr(), garbage.len()) },
            RndResult::DeserializeError
        );
        unsafe { rnd_session_destroy(session) };
    }

    // -----------------------------------------------------------------------
    // Poisoning
    // -----------------------------------------------------------------------

    #[test]
    fn poisoned_session_falls_through() {
        let session = create_stock(0.0);
        unsafe { &*session }.poisoned.set(true);
        assert!(unsafe { rnd_is_poisoned(session) });

        let mut out = false;
        assert!(!unsafe { rnd_can_afford(session, 1.0, &mut out) });
        assert_eq!(unsafe { rnd_session_reset(session) }, RndResult::Poisoned);

        assert_eq!(unsafe { rnd_clear_poison(session) }, RndResult::Ok);
        assert!(!unsafe { rnd_is_poisoned(session) });
        assert!(unsafe { rnd_can_afford(session, 0.0, &mut out) });
        assert!(out);
        unsafe { rnd_session_destroy(session) };
    }

    #[test]
    fn panic_in_override_poisons() {
        let session = create_stock(0.0);
        let dispatch: Dispatch<bool> = unsafe { run(session, |_| panic!("boom")) };
        assert_eq!(dispatch, Dispatch::Fallthrough);
        assert!(unsafe { rnd_is_poisoned(session) });
        unsafe { rnd_session_destroy(session) };
    }
}
