//! Error vocabulary for the P2P layer (spec.md §4.9, §7).

use thiserror::Error;

use super::state_machine::PeerEvent;
use shared_types::PeerState;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum P2pError {
    #[error("no valid transition from {from:?} on {event:?}")]
    InvalidTransition { from: PeerState, event: PeerEvent },

    #[error("peer's node id matches our own (self-connection)")]
    SelfConnection,

    #[error("network id mismatch: expected {expected}, got {got}")]
    NetworkMismatch { expected: String, got: String },

    #[error("peer is currently banned")]
    Banned,

    #[error("peer not found")]
    UnknownPeer,

    #[error("connected-peer capacity reached")]
    AtCapacity,
}

impl From<P2pError> for shared_types::CoreError {
    fn from(value: P2pError) -> Self {
        match value {
            P2pError::SelfConnection | P2pError::NetworkMismatch { .. } => {
                shared_types::CoreError::PeerMisbehavior(value.to_string())
            }
            P2pError::InvalidTransition { .. } => shared_types::CoreError::Conflict(value.to_string()),
            P2pError::Banned => shared_types::CoreError::PolicyViolation(value.to_string()),
            P2pError::UnknownPeer => shared_types::CoreError::NotFound(value.to_string()),
            P2pError::AtCapacity => shared_types::CoreError::Unavailable(value.to_string()),
        }
    }
}
