//! Inbound port: the mempool contract the rest of the node depends on.

use shared_types::{Address, Block, FixedPoint, Hash, Transaction};

use crate::domain::errors::MempoolError;

/// Fee-ordered pool of pending, not-yet-included transactions, per
/// spec.md §4.5.
///
/// Block-applied removal and reorg reinsertion are both driven from the
/// outside: the mempool does not watch the chain itself. A consensus
/// driver calls [`Mempool::remove_included`] when a block lands and
/// [`Mempool::candidates_from_reverted`] when one is rolled back, then
/// re-validates and re-inserts whatever of those candidates still clears
/// validation.
pub trait Mempool: Send + Sync {
    /// Admit a transaction. Rejects duplicates by id and, once the pool is
    /// at capacity, transactions whose fee does not clear the current
    /// eviction floor.
    fn insert(&self, tx: Transaction) -> Result<(), MempoolError>;

    fn remove(&self, id: &Hash) -> Option<Transaction>;

    /// Drop every transaction included in `block` from the pool. Called
    /// once a block has been accepted and applied to state.
    fn remove_included(&self, block: &Block);

    /// The transactions a reverted block contained, returned so the
    /// caller can revalidate and optionally reinsert them. The mempool
    /// does not reinsert on its own: a reverted transaction may no longer
    /// be valid against the post-revert state.
    fn candidates_from_reverted(&self, block: &Block) -> Vec<Transaction>;

    /// Highest-fee-first selection, optionally floored at `min_fee`,
    /// capped at `limit` entries. Used by block producers assembling the
    /// next PoRS block.
    fn by_fee(&self, min_fee: Option<FixedPoint>, limit: usize) -> Vec<Transaction>;

    fn for_address(&self, address: &Address) -> Vec<Transaction>;

    fn contains(&self, id: &Hash) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
