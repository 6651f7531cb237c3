//! Error vocabulary for state application.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("insufficient funds: available {available}, required {required}")]
    InsufficientFunds { available: String, required: String },

    #[error("policy violation: {0}")]
    PolicyViolation(String),

    #[error("malformed entity: {0}")]
    Malformed(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("underlying store I/O error: {0}")]
    StoreIO(String),
}

impl From<StateError> for shared_types::CoreError {
    fn from(value: StateError) -> Self {
        match value {
            StateError::InsufficientFunds { available, required } => {
                shared_types::CoreError::InsufficientFunds { available, required }
            }
            StateError::PolicyViolation(msg) => shared_types::CoreError::PolicyViolation(msg),
            StateError::Malformed(msg) => shared_types::CoreError::MalformedEntity(msg),
            StateError::Conflict(msg) => shared_types::CoreError::Conflict(msg),
            StateError::StoreIO(msg) => shared_types::CoreError::StoreIO(msg),
        }
    }
}

impl From<qc_chain_store::StoreError> for StateError {
    fn from(value: qc_chain_store::StoreError) -> Self {
        StateError::StoreIO(value.to_string())
    }
}
