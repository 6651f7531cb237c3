//! Inbound port: the validator contract the rest of the node depends on.

use shared_types::{Block, Transaction};

use crate::domain::errors::ValidatorError;

/// Re-derives validity from first principles; never trusts a
/// pre-validated flag carried by the message that delivered the entity
/// (spec.md §4.6's "Zero-Trust" stance, generalized from the teacher's
/// signature-verification crate to the full transaction/block rule set).
pub trait Validator: Send + Sync {
    /// Structural, cryptographic, and balance checks for a single
    /// transaction. Does not check for double-spend against the mempool —
    /// that is the mempool's own admission-time concern.
    fn validate_transaction(&self, tx: &Transaction) -> Result<(), ValidatorError>;

    /// Full block validation: chain position, recomputed hash, and the
    /// block-type-specific proof rules.
    fn validate_block(&self, block: &Block) -> Result<(), ValidatorError>;
}
