use crate::id::{BodyId, ExperimentId, PartId};

/// Errors raised while registering catalog content. Runtime lookups never
/// fail; only malformed definitions are rejected.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("duplicate body id: {0}")]
    DuplicateBody(BodyId),

    #[error("duplicate experiment id: {0}")]
    DuplicateExperiment(ExperimentId),

    #[error("duplicate part id: {0}")]
    DuplicatePart(PartId),

    #[error("experiment {id} has a non-positive science cap ({cap})")]
    InvalidCap { id: ExperimentId, cap: f64 },

    #[error("experiment {id} has a non-positive data scale ({scale})")]
    InvalidDataScale { id: ExperimentId, scale: f64 },

    #[error("body {body} has a non-positive {situation} multiplier ({value})")]
    InvalidMultiplier {
        body: BodyId,
        situation: &'static str,
        value: f64,
    },
}
