//! Privacy-subsystem error types.

use thiserror::Error;

/// Errors raised while building or verifying confidential transfers,
/// stealth payment hints, or mixing sessions.
#[derive(Debug, Error)]
pub enum PrivacyError {
    /// A commitment or proof byte string did not decode to a valid
    /// Ristretto point.
    #[error("invalid commitment encoding")]
    InvalidPointEncoding,

    /// A range proof bundle failed to deserialize.
    #[error("malformed range proof bundle: {0}")]
    MalformedProof(String),

    /// A range proof's bit count did not match what the verifier expects.
    #[error("range proof has {actual} bit proofs, expected {expected}")]
    BitCountMismatch { expected: usize, actual: usize },

    /// The aggregated bit commitments did not reconstruct the amount
    /// commitment being proven.
    #[error("range proof does not aggregate to the claimed commitment")]
    AggregationMismatch,

    /// One of the per-bit OR-proofs failed to verify.
    #[error("bit proof {0} failed to verify")]
    BitProofInvalid(usize),

    /// A value exceeds what a 64-bit range proof can bound.
    #[error("value out of range for a {0}-bit proof")]
    ValueOutOfRange(usize),

    /// A stealth hint's ECDH derivation failed (malformed public key).
    #[error("stealth hint derivation failed: {0}")]
    StealthDerivationFailed(String),

    /// A blind-signature operation received input of the wrong shape.
    #[error("blind signature error: {0}")]
    BlindSignature(String),

    /// Mixing-session errors: phase transitions, participant bookkeeping.
    #[error("mixing session error: {0}")]
    Mixing(String),

    /// No session exists with the given id.
    #[error("unknown mixing session")]
    UnknownSession,
}

impl From<PrivacyError> for shared_types::CoreError {
    fn from(value: PrivacyError) -> Self {
        shared_types::CoreError::MalformedEntity(value.to_string())
    }
}
