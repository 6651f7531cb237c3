//! The transaction pool's in-memory indices: unique-by-id storage plus a
//! fee/timestamp ordered index for both "select highest fee first" and
//! "evict lowest fee / oldest first" queries, which are the same ordering
//! read from opposite ends.

use std::collections::{BTreeMap, BTreeSet};

use shared_types::{Address, FixedPoint, Hash, Transaction};

use super::errors::MempoolError;

/// Bytes, roughly, a transaction occupies in the pool — used only for the
/// byte-size capacity cap, not for consensus purposes.
fn approx_size(tx: &Transaction) -> usize {
    64 + tx.memo.as_ref().map_or(0, |_| 256) + tx.confidential_data.as_ref().map_or(0, |_| 512)
}

/// Ascending by `(fee, timestamp, id)`: the lowest-fee, oldest transaction
/// sorts first. Reading from the front gives eviction order; reading from
/// the back gives fee-ordered selection order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct PriorityKey {
    fee: u64,
    timestamp: u64,
    id: Hash,
}

pub struct TransactionPool {
    max_count: usize,
    max_bytes: usize,
    by_id: BTreeMap<Hash, Transaction>,
    by_priority: BTreeSet<PriorityKey>,
    by_address: BTreeMap<Address, BTreeSet<Hash>>,
    total_bytes: usize,
}

impl TransactionPool {
    pub fn new(max_count: usize, max_bytes: usize) -> Self {
        Self {
            max_count,
            max_bytes,
            by_id: BTreeMap::new(),
            by_priority: BTreeSet::new(),
            by_address: BTreeMap::new(),
            total_bytes: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    fn key_of(tx: &Transaction) -> PriorityKey {
        PriorityKey { fee: tx.fee.0, timestamp: tx.timestamp, id: tx.id }
    }

    fn index_address(by_address: &mut BTreeMap<Address, BTreeSet<Hash>>, address: &Address, id: Hash) {
        by_address.entry(address.clone()).or_default().insert(id);
    }

    fn unindex_address(by_address: &mut BTreeMap<Address, BTreeSet<Hash>>, address: &Address, id: &Hash) {
        if let Some(set) = by_address.get_mut(address) {
            set.remove(id);
            if set.is_empty() {
                by_address.remove(address);
            }
        }
    }

    /// Insert a validated transaction. Rejects duplicates by id. If the
    /// pool is at capacity, evicts the lowest-fee/oldest entries to make
    /// room, unless the incoming transaction itself would be the one
    /// evicted (i.e. its fee does not clear the current floor).
    pub fn insert(&mut self, tx: Transaction) -> Result<(), MempoolError> {
        if self.by_id.contains_key(&tx.id) {
            return Err(MempoolError::Duplicate(format!("{:x?}", tx.id)));
        }

        let size = approx_size(&tx);
        let incoming_key = Self::key_of(&tx);

        while self.by_id.len() >= self.max_count || self.total_bytes + size > self.max_bytes {
            let Some(lowest) = self.by_priority.iter().next().cloned() else {
                // Pool is "full" only on paper (e.g. max_bytes = 0); refuse
                // rather than loop forever.
                return Err(MempoolError::PolicyViolation(
                    "pool at capacity and no entry to evict".into(),
                ));
            };
            if lowest >= incoming_key {
                return Err(MempoolError::PolicyViolation(
                    "pool at capacity; fee too low to displace existing entries".into(),
                ));
            }
            self.remove_by_key(&lowest);
        }

        self.by_priority.insert(incoming_key);
        Self::index_address(&mut self.by_address, &tx.sender, tx.id);
        Self::index_address(&mut self.by_address, &tx.recipient, tx.id);
        self.total_bytes += size;
        self.by_id.insert(tx.id, tx);
        Ok(())
    }

    fn remove_by_key(&mut self, key: &PriorityKey) {
        self.by_priority.remove(key);
        if let Some(tx) = self.by_id.remove(&key.id) {
            self.total_bytes -= approx_size(&tx);
            Self::unindex_address(&mut self.by_address, &tx.sender, &tx.id);
            Self::unindex_address(&mut self.by_address, &tx.recipient, &tx.id);
        }
    }

    pub fn remove(&mut self, id: &Hash) -> Option<Transaction> {
        let Some(tx) = self.by_id.get(id) else { return None };
        let key = Self::key_of(tx);
        let removed = self.by_id.remove(id);
        if let Some(ref tx) = removed {
            self.by_priority.remove(&key);
            self.total_bytes -= approx_size(tx);
            Self::unindex_address(&mut self.by_address, &tx.sender, id);
            Self::unindex_address(&mut self.by_address, &tx.recipient, id);
        }
        removed
    }

    pub fn contains(&self, id: &Hash) -> bool {
        self.by_id.contains_key(id)
    }

    /// Highest-fee-first selection, optionally floored at `min_fee`,
    /// capped at `limit` entries.
    pub fn by_fee(&self, min_fee: Option<FixedPoint>, limit: usize) -> Vec<Transaction> {
        self.by_priority
            .iter()
            .rev()
            .filter(|k| min_fee.map_or(true, |min| k.fee >= min.0))
            .take(limit)
            .filter_map(|k| self.by_id.get(&k.id).cloned())
            .collect()
    }

    pub fn for_address(&self, address: &Address) -> Vec<Transaction> {
        self.by_address
            .get(address)
            .map(|ids| ids.iter().filter_map(|id| self.by_id.get(id).cloned()).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::TransactionStatus;

    fn tx(id: u8, sender: &str, fee: u64, timestamp: u64) -> Transaction {
        Transaction {
            id: [id; 32],
            sender: Address::new_unchecked(sender.to_string()),
            recipient: Address::new_unchecked("R".to_string()),
            amount: Some(FixedPoint(100)),
            fee: FixedPoint(fee),
            timestamp,
            signature: Some(vec![1]),
            memo: None,
            confidential_data: None,
            status: TransactionStatus::Pending,
        }
    }

    #[test]
    fn rejects_duplicate_ids() {
        let mut pool = TransactionPool::new(10, 1_000_000);
        pool.insert(tx(1, "a", 5, 1)).unwrap();
        assert!(matches!(pool.insert(tx(1, "a", 5, 1)), Err(MempoolError::Duplicate(_))));
    }

    #[test]
    fn by_fee_orders_highest_first() {
        let mut pool = TransactionPool::new(10, 1_000_000);
        pool.insert(tx(1, "a", 5, 1)).unwrap();
        pool.insert(tx(2, "b", 50, 2)).unwrap();
        pool.insert(tx(3, "c", 20, 3)).unwrap();

        let selected = pool.by_fee(None, 10);
        assert_eq!(selected[0].fee, FixedPoint(50));
        assert_eq!(selected[1].fee, FixedPoint(20));
        assert_eq!(selected[2].fee, FixedPoint(5));
    }

    #[test]
    fn eviction_drops_lowest_fee_first() {
        let mut pool = TransactionPool::new(2, 1_000_000);
        pool.insert(tx(1, "a", 5, 1)).unwrap();
        pool.insert(tx(2, "b", 50, 2)).unwrap();
        pool.insert(tx(3, "c", 20, 3)).unwrap();

        assert_eq!(pool.len(), 2);
        assert!(!pool.contains(&[1u8; 32]));
        assert!(pool.contains(&[2u8; 32]));
        assert!(pool.contains(&[3u8; 32]));
    }

    #[test]
    fn low_fee_rejected_when_pool_full_and_at_floor() {
        let mut pool = TransactionPool::new(1, 1_000_000);
        pool.insert(tx(1, "a", 50, 1)).unwrap();
        assert!(pool.insert(tx(2, "b", 5, 2)).is_err());
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn for_address_finds_sender_and_recipient() {
        let mut pool = TransactionPool::new(10, 1_000_000);
        pool.insert(tx(1, "a", 5, 1)).unwrap();

        assert_eq!(pool.for_address(&Address::new_unchecked("a".to_string())).len(), 1);
        assert_eq!(pool.for_address(&Address::new_unchecked("R".to_string())).len(), 1);
    }
}
