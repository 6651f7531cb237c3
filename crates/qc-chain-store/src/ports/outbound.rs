//! Outbound ports (driven ports): the key-value abstraction this crate
//! requires the host application to supply.

use crate::domain::errors::StoreError;

/// Abstract interface for key-value database operations.
///
/// Production: [`crate::adapters::sled_store::SledKVStore`].
/// Testing: [`crate::adapters::memory::InMemoryKVStore`].
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// Execute an atomic batch write.
    ///
    /// Either ALL operations in the batch succeed, or NONE are applied —
    /// this is how `append`/`truncate_above` stay crash-consistent across
    /// a block's primary record and all of its secondary index entries.
    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), StoreError>;

    /// Iterate over keys with a prefix, in ascending key order.
    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError>;

    /// Flush to durable storage. No-op for purely in-memory adapters.
    fn flush(&self) -> Result<(), StoreError>;
}

/// A single write or delete within an atomic batch.
#[derive(Debug, Clone)]
pub enum BatchOperation {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

impl BatchOperation {
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Delete { key: key.into() }
    }
}
