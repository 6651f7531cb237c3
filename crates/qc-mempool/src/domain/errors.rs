//! Error vocabulary for mempool admission.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MempoolError {
    #[error("duplicate transaction: {0:x?}")]
    Duplicate(String),

    #[error("transaction not found: {0}")]
    NotFound(String),

    #[error("policy violation: {0}")]
    PolicyViolation(String),
}

impl From<MempoolError> for shared_types::CoreError {
    fn from(value: MempoolError) -> Self {
        match value {
            MempoolError::Duplicate(msg) => shared_types::CoreError::Duplicate(msg),
            MempoolError::NotFound(msg) => shared_types::CoreError::NotFound(msg),
            MempoolError::PolicyViolation(msg) => shared_types::CoreError::PolicyViolation(msg),
        }
    }
}
