//! Error vocabulary for the PoRW engine (spec.md §4.7, §7).

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PorwError {
    #[error("folding candidate does not resolve to the declared protein_data_ref")]
    InputIdentifierMismatch,

    #[error("score {score} is below the minimum acceptable threshold {threshold}")]
    ScoreBelowThreshold { score: f64, threshold: f64 },

    #[error("re-scored structure diverges from the claimed score: claimed {claimed}, rescored {rescored}, epsilon {epsilon}")]
    ScoreDivergence { claimed: f64, rescored: f64, epsilon: f64 },

    #[error("zero-knowledge attestation failed verification")]
    InvalidAttestation,

    #[error("compute backend error: {0}")]
    Compute(String),

    #[error("no eligible folding target available")]
    NoEligibleTarget,
}

impl From<PorwError> for shared_types::CoreError {
    fn from(value: PorwError) -> Self {
        match value {
            PorwError::InputIdentifierMismatch
            | PorwError::ScoreBelowThreshold { .. }
            | PorwError::ScoreDivergence { .. }
            | PorwError::InvalidAttestation => shared_types::CoreError::InvalidProof(value.to_string()),
            PorwError::Compute(_) => shared_types::CoreError::Unavailable(value.to_string()),
            PorwError::NoEligibleTarget => shared_types::CoreError::NotFound(value.to_string()),
        }
    }
}

impl From<qc_compute::ComputeError> for PorwError {
    fn from(value: qc_compute::ComputeError) -> Self {
        PorwError::Compute(value.to_string())
    }
}
