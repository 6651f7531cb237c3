//! Error vocabulary for the consensus driver (spec.md §4.10, §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("block failed validation: {0}")]
    Validation(#[from] qc_validator::ValidatorError),

    #[error("chain store error: {0}")]
    Store(#[from] qc_chain_store::StoreError),

    #[error("state application error: {0}")]
    State(#[from] qc_state::StateError),

    #[error("mempool error: {0}")]
    Mempool(#[from] qc_mempool::MempoolError),

    #[error("PoRW engine error: {0}")]
    Porw(#[from] qc_porw::PorwError),

    #[error("PoRS engine error: {0}")]
    Pors(#[from] qc_pors::PorsError),

    #[error("candidate branch's fork point at {fork_point_index} is at or below the last checkpoint at {checkpoint_index}")]
    ReorgBelowCheckpoint { fork_point_index: u64, checkpoint_index: u64 },

    #[error("candidate branch reorg depth {depth} exceeds policy ceiling {max_depth}")]
    ReorgTooDeep { depth: u64, max_depth: u64 },

    #[error("could not trace candidate branch back to a known ancestor within the reorg depth ceiling")]
    UnknownForkPoint,

    #[error("failed to assemble block header: {0}")]
    Assembly(String),
}

impl From<ConsensusError> for shared_types::CoreError {
    fn from(value: ConsensusError) -> Self {
        match value {
            ConsensusError::Validation(e) => e.into(),
            ConsensusError::Store(e) => e.into(),
            ConsensusError::State(e) => e.into(),
            ConsensusError::Mempool(e) => e.into(),
            ConsensusError::Porw(e) => e.into(),
            ConsensusError::Pors(e) => e.into(),
            ConsensusError::ReorgBelowCheckpoint { .. } => shared_types::CoreError::PolicyViolation(value.to_string()),
            ConsensusError::ReorgTooDeep { .. } => shared_types::CoreError::PolicyViolation(value.to_string()),
            ConsensusError::UnknownForkPoint => shared_types::CoreError::NotFound(value.to_string()),
            ConsensusError::Assembly(_) => shared_types::CoreError::MalformedEntity(value.to_string()),
        }
    }
}
