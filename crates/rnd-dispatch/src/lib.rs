//! RnD Dispatch -- the override surface the host's call sites reach.
//!
//! Every call site the host redirects lands on one method of
//! [`ResearchOverrides`] and gets back a [`Dispatch`]: either a replacement
//! result the caller must use as-is, or a fallthrough that lets the
//! caller's default logic run.
//!
//! All research state lives in a [`ResearchSession`], created when a save
//! is loaded and dropped when it is unloaded. The host holds the session
//! and passes it to every override point; nothing here is global.
//!
//! # Key Types
//!
//! - [`Dispatch`] -- `Override(result)` or `Fallthrough`.
//! - [`ResearchOverrides`] -- One method per override point.
//! - [`ResearchSession`] -- The engine context: catalogs, ledgers, tech tree.
//! - [`SaveRecords`] -- Flat keyed records persisted with the host's save.

pub mod debug;
pub mod dispatch;
pub mod overrides;
pub mod persist;
pub mod session;

pub use dispatch::Dispatch;
pub use overrides::{Passthrough, ResearchOverrides};
pub use persist::SaveRecords;
pub use session::{ResearchSession, SubjectRequest};
