//! Error vocabulary for transaction/block validation (spec.md §4.6, §7).

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidatorError {
    #[error("malformed entity: {0}")]
    MalformedEntity(String),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid proof: {0}")]
    InvalidProof(String),

    #[error("insufficient funds: have {available}, need {required}")]
    InsufficientFunds { available: String, required: String },

    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<ValidatorError> for shared_types::CoreError {
    fn from(value: ValidatorError) -> Self {
        match value {
            ValidatorError::MalformedEntity(msg) => shared_types::CoreError::MalformedEntity(msg),
            ValidatorError::InvalidSignature => shared_types::CoreError::InvalidSignature,
            ValidatorError::InvalidProof(msg) => shared_types::CoreError::InvalidProof(msg),
            ValidatorError::InsufficientFunds { available, required } => {
                shared_types::CoreError::InsufficientFunds { available, required }
            }
            ValidatorError::Conflict(msg) => shared_types::CoreError::Conflict(msg),
        }
    }
}

impl From<qc_chain_store::StoreError> for ValidatorError {
    fn from(value: qc_chain_store::StoreError) -> Self {
        ValidatorError::Conflict(value.to_string())
    }
}
