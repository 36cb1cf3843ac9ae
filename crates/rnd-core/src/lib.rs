//! RnD Core -- the research economy model shared by every override point.
//!
//! This crate owns the data the host's research subsystem used to own:
//! where measurements can be taken, what experiments are worth, how much has
//! already been collected per subject, and which parts are currently flagged
//! as experimental.
//!
//! # Value pipeline
//!
//! A measurement of `amount` data units for a subject is worth
//!
//! ```text
//! reference  = amount / data_scale
//! raw        = reference * base_value * difficulty * transmission * gain
//! diminished = raw * max(0, 1 - collected / cap)
//! credited   = min(diminished, cap - collected)
//! ```
//!
//! [`value::ValueEngine`] evaluates that pipeline without touching state;
//! [`value::ValueEngine::commit`] is the single mutating step.
//!
//! # Key Types
//!
//! - [`biome::BiomeCatalog`] -- Ordered biome and mini-biome tags per body.
//! - [`experiment::ExperimentCatalog`] -- Experiment definitions and result text.
//! - [`subject::SubjectLedger`] -- Lazily created subjects and their collected totals.
//! - [`value::ValueEngine`] -- Diminishing-returns currency computation.
//! - [`ledger::CurrencyLedger`] -- The host's science balance.
//! - [`parts::ExperimentalParts`] -- Reference-counted experimental flags.
//! - [`rng::SimRng`] -- Deterministic PRNG for result text selection.

pub mod biome;
pub mod error;
pub mod experiment;
pub mod id;
pub mod ledger;
pub mod mode;
pub mod parts;
pub mod rng;
pub mod situation;
pub mod subject;
pub mod value;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::CatalogError;
