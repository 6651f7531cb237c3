//! In-memory key-value store for unit tests and ephemeral nodes.

use crate::domain::errors::StoreError;
use crate::ports::outbound::{BatchOperation, KeyValueStore};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// `BTreeMap`-backed store. Ordered iteration makes `prefix_scan` cheap
/// and deterministic, which matters for `range()`/`txs_for_address()`.
#[derive(Default)]
pub struct InMemoryKVStore {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl InMemoryKVStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for InMemoryKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let data = self.data.read().expect("lock poisoned");
        Ok(data.get(key).cloned())
    }

    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), StoreError> {
        let mut data = self.data.write().expect("lock poisoned");
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    data.insert(key, value);
                }
                BatchOperation::Delete { key } => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let data = self.data.read().expect("lock poisoned");
        Ok(data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_write_is_applied_in_order() {
        let store = InMemoryKVStore::new();
        store
            .atomic_batch_write(vec![
                BatchOperation::put(b"a".to_vec(), b"1".to_vec()),
                BatchOperation::put(b"b".to_vec(), b"2".to_vec()),
                BatchOperation::delete(b"a".to_vec()),
            ])
            .unwrap();

        assert_eq!(store.get(b"a").unwrap(), None);
        assert_eq!(store.get(b"b").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn prefix_scan_is_ordered() {
        let store = InMemoryKVStore::new();
        store
            .atomic_batch_write(vec![
                BatchOperation::put(b"blk:idx:2".to_vec(), b"two".to_vec()),
                BatchOperation::put(b"blk:idx:1".to_vec(), b"one".to_vec()),
                BatchOperation::put(b"other".to_vec(), b"x".to_vec()),
            ])
            .unwrap();

        let scanned = store.prefix_scan(b"blk:idx:").unwrap();
        assert_eq!(scanned.len(), 2);
        assert_eq!(scanned[0].1, b"one".to_vec());
        assert_eq!(scanned[1].1, b"two".to_vec());
    }
}
