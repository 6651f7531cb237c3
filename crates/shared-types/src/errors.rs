//! Cross-cutting error vocabulary (spec §7).
//!
//! Every subsystem maps its leaf errors into one of these kinds rather than
//! inventing its own taxonomy, so the consensus driver can translate a
//! failure into a peer-scoped consequence (reputation loss, ban) or a
//! user-scoped rejection (mempool refusal) without knowing which subsystem
//! raised it.

use thiserror::Error;

/// The full error kind vocabulary shared across the node.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("malformed entity: {0}")]
    MalformedEntity(String),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid proof: {0}")]
    InvalidProof(String),

    #[error("duplicate: {0}")]
    Duplicate(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("insufficient funds: have {available}, need {required}")]
    InsufficientFunds { available: String, required: String },

    #[error("policy violation: {0}")]
    PolicyViolation(String),

    #[error("peer misbehavior: {0}")]
    PeerMisbehavior(String),

    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("store I/O error: {0}")]
    StoreIO(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl CoreError {
    /// Whether retrying the same operation could plausibly succeed.
    /// `Timeout` is always recoverable; validator errors (malformed data,
    /// bad signatures, bad proofs) never are, since invalid data does not
    /// become valid on retry.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CoreError::Timeout(_) | CoreError::Unavailable(_))
    }

    /// Whether this error should cost the offering peer reputation.
    #[must_use]
    pub fn penalizes_peer(&self) -> bool {
        matches!(
            self,
            CoreError::MalformedEntity(_)
                | CoreError::InvalidSignature
                | CoreError::InvalidProof(_)
                | CoreError::PeerMisbehavior(_)
        )
    }

    /// Short, user-safe reason string. Never includes internal detail beyond
    /// what was already captured in the variant — no stack traces cross the
    /// wire.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            CoreError::MalformedEntity(_) => "malformed_entity",
            CoreError::InvalidSignature => "invalid_signature",
            CoreError::InvalidProof(_) => "invalid_proof",
            CoreError::Duplicate(_) => "duplicate",
            CoreError::NotFound(_) => "not_found",
            CoreError::Conflict(_) => "conflict",
            CoreError::InsufficientFunds { .. } => "insufficient_funds",
            CoreError::PolicyViolation(_) => "policy_violation",
            CoreError::PeerMisbehavior(_) => "peer_misbehavior",
            CoreError::Timeout(_) => "timeout",
            CoreError::StoreIO(_) => "store_io",
            CoreError::Unavailable(_) => "unavailable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_recoverable() {
        assert!(CoreError::Timeout("peer slow".into()).is_recoverable());
    }

    #[test]
    fn invalid_signature_is_not_recoverable() {
        assert!(!CoreError::InvalidSignature.is_recoverable());
    }

    #[test]
    fn validator_errors_penalize_the_peer() {
        assert!(CoreError::InvalidProof("bad porw score".into()).penalizes_peer());
        assert!(!CoreError::Timeout("slow".into()).penalizes_peer());
    }

    #[test]
    fn kind_name_is_stable_and_wire_safe() {
        assert_eq!(CoreError::NotFound("tx".into()).kind_name(), "not_found");
    }
}
