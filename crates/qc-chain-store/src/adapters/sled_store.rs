//! `sled`-backed durable key-value store.
//!
//! The teacher repo uses `rocksdb` for this role; we substitute `sled`
//! because it is a pure-Rust embedded store (no C toolchain requirement)
//! with a transactional batch API that fits the append-then-index write
//! path just as well (see DESIGN.md for the full rationale).

use crate::domain::errors::StoreError;
use crate::ports::outbound::{BatchOperation, KeyValueStore};

pub struct SledKVStore {
    db: sled::Db,
}

impl SledKVStore {
    /// Open (creating if absent) a durable store at `path`.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Open a temporary store backed by an anonymous tmpfile; useful for
    /// integration tests that want real `sled` semantics without leaving
    /// files behind.
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }
}

impl KeyValueStore for SledKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.db.get(key)?.map(|v| v.to_vec()))
    }

    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), StoreError> {
        let mut batch = sled::Batch::default();
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => batch.insert(key, value),
                BatchOperation::Delete { key } => batch.remove(key),
            }
        }
        self.db.apply_batch(batch)?;
        Ok(())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let mut results = Vec::new();
        for entry in self.db.scan_prefix(prefix) {
            let (k, v) = entry?;
            results.push((k.to_vec(), v.to_vec()));
        }
        Ok(results)
    }

    fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporary_store_round_trips() {
        let store = SledKVStore::temporary().unwrap();
        store
            .atomic_batch_write(vec![BatchOperation::put(b"k".to_vec(), b"v".to_vec())])
            .unwrap();
        assert_eq!(store.get(b"k").unwrap(), Some(b"v".to_vec()));
    }
}
