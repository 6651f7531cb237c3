//! Error vocabulary for the PoRS engine (spec.md §4.8, §7).

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PorsError {
    #[error("chunk has zero length")]
    EmptyChunk,

    #[error("chunk too small for the requested challenge shape")]
    ChunkTooSmallForChallenge,

    #[error("challenge parameters reference bytes outside the chunk")]
    ChallengeParamsOutOfRange,

    #[error("response's challenge_id does not match the issued challenge")]
    ChallengeIdMismatch,

    #[error("challenge_id was already bound to an earlier block")]
    ChallengeIdReused,

    #[error("quorum not met: have {have}, need {need}")]
    QuorumNotMet { have: usize, need: usize },

    #[error("no authoritative copy available for chunk")]
    UnknownChunk,
}

impl From<PorsError> for shared_types::CoreError {
    fn from(value: PorsError) -> Self {
        match value {
            PorsError::EmptyChunk
            | PorsError::ChunkTooSmallForChallenge
            | PorsError::ChallengeParamsOutOfRange
            | PorsError::ChallengeIdMismatch => shared_types::CoreError::MalformedEntity(value.to_string()),
            PorsError::ChallengeIdReused => shared_types::CoreError::Duplicate(value.to_string()),
            PorsError::QuorumNotMet { .. } => shared_types::CoreError::InvalidProof(value.to_string()),
            PorsError::UnknownChunk => shared_types::CoreError::NotFound(value.to_string()),
        }
    }
}
