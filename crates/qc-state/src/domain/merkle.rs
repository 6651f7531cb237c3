//! Flat sorted Merkle tree over `(address, balance)` leaves.
//!
//! The teacher's state manager builds a full Patricia–Merkle trie (nibble
//! paths, RLP encoding, extension/branch/leaf nodes) because its account
//! model carries code and storage roots. This node's accounts are a plain
//! `address -> balance` mapping, so we keep the teacher's *shape* — a
//! sorted-leaves commitment with a deterministic root — but drop the trie
//! machinery in favor of a binary Merkle tree over leaves sorted by
//! address (the same order `BTreeMap<Address, _>` already iterates in).

use shared_types::{Address, FixedPoint, Hash};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

fn leaf_hash(address: &Address, balance: FixedPoint) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(b"qc-state-leaf-v1");
    hasher.update(address.as_str().as_bytes());
    hasher.update(balance.0.to_be_bytes());
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

fn parent_hash(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(b"qc-state-node-v1");
    hasher.update(left);
    hasher.update(right);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Compute the Merkle root over sorted `(address, balance)` leaves.
/// An empty balance map has the all-zero root.
pub fn merkle_root(balances: &BTreeMap<Address, FixedPoint>) -> Hash {
    if balances.is_empty() {
        return [0u8; 32];
    }

    let mut level: Vec<Hash> = balances
        .iter()
        .map(|(addr, bal)| leaf_hash(addr, *bal))
        .collect();

    while level.len() > 1 {
        if level.len() % 2 == 1 {
            level.push(*level.last().expect("non-empty"));
        }
        level = level
            .chunks(2)
            .map(|pair| parent_hash(&pair[0], &pair[1]))
            .collect();
    }

    level[0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::Address;

    fn addr(s: &str) -> Address {
        Address::new_unchecked(s.to_string())
    }

    #[test]
    fn empty_balances_have_zero_root() {
        let balances = BTreeMap::new();
        assert_eq!(merkle_root(&balances), [0u8; 32]);
    }

    #[test]
    fn root_is_order_independent_of_insertion() {
        let mut a = BTreeMap::new();
        a.insert(addr("alice"), FixedPoint(100));
        a.insert(addr("bob"), FixedPoint(50));

        let mut b = BTreeMap::new();
        b.insert(addr("bob"), FixedPoint(50));
        b.insert(addr("alice"), FixedPoint(100));

        assert_eq!(merkle_root(&a), merkle_root(&b));
    }

    #[test]
    fn root_changes_with_balance() {
        let mut a = BTreeMap::new();
        a.insert(addr("alice"), FixedPoint(100));
        let root_a = merkle_root(&a);

        a.insert(addr("alice"), FixedPoint(101));
        let root_b = merkle_root(&a);

        assert_ne!(root_a, root_b);
    }

    #[test]
    fn odd_leaf_count_duplicates_last() {
        let mut balances = BTreeMap::new();
        balances.insert(addr("a"), FixedPoint(1));
        balances.insert(addr("b"), FixedPoint(2));
        balances.insert(addr("c"), FixedPoint(3));
        // Should not panic on an odd leaf count.
        let _ = merkle_root(&balances);
    }
}
