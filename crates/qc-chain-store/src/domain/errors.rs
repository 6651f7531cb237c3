//! Error vocabulary for the chain store.

use thiserror::Error;

/// Errors surfaced by chain store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("block or transaction not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage I/O failure: {0}")]
    StoreIO(String),

    #[error("malformed entity: {0}")]
    Malformed(String),
}

impl From<sled::Error> for StoreError {
    fn from(value: sled::Error) -> Self {
        StoreError::StoreIO(value.to_string())
    }
}

impl From<bincode::Error> for StoreError {
    fn from(value: bincode::Error) -> Self {
        StoreError::Malformed(value.to_string())
    }
}

impl From<StoreError> for shared_types::CoreError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(msg) => shared_types::CoreError::NotFound(msg),
            StoreError::Conflict(msg) => shared_types::CoreError::Conflict(msg),
            StoreError::StoreIO(msg) => shared_types::CoreError::StoreIO(msg),
            StoreError::Malformed(msg) => shared_types::CoreError::MalformedEntity(msg),
        }
    }
}
