//! Inbound port: the chain store contract the rest of the node depends on.

use crate::domain::errors::StoreError;
use shared_types::{Block, BlockType, Hash, Transaction};

/// Durable, append-only store of blocks with secondary indices, per
/// spec.md §4.3.
pub trait ChainStore: Send + Sync {
    /// Append a block. Fails with `Conflict` if `index`/`block_hash` are
    /// already present or if `index` does not extend the current tip.
    fn append(&self, block: &Block) -> Result<(), StoreError>;

    fn get_by_index(&self, index: u64) -> Result<Option<Block>, StoreError>;

    fn get_by_hash(&self, hash: &shared_types::Hash) -> Result<Option<Block>, StoreError>;

    /// The highest-index block, if any.
    fn latest(&self) -> Result<Option<Block>, StoreError>;

    /// The most recent block of the given type, optionally restricted to
    /// strictly before `before_index`.
    fn latest_by_type(
        &self,
        block_type: BlockType,
        before_index: Option<u64>,
    ) -> Result<Option<Block>, StoreError>;

    /// Inclusive range of blocks `[start, end]` ordered by index.
    fn range(&self, start: u64, end: u64) -> Result<Vec<Block>, StoreError>;

    fn get_tx(&self, id: &Hash) -> Result<Option<Transaction>, StoreError>;

    /// Transactions touching `address` as sender or recipient, optionally
    /// restricted to those after `since_tx` in insertion order.
    fn txs_for_address(
        &self,
        address: &shared_types::Address,
        since_tx: Option<Hash>,
    ) -> Result<Vec<Transaction>, StoreError>;

    /// Roll back to `index` inclusive, deleting every block above it and
    /// all of their secondary index entries. Atomic.
    fn truncate_above(&self, index: u64) -> Result<(), StoreError>;
}
