//! Inbound port: the state manager contract the rest of the node depends
//! on, per spec.md §4.4.

use shared_types::{Address, Block, FixedPoint, StateSnapshot};

use crate::domain::errors::StateError;

/// Account balances, total supply, and fees collected, derived from block
/// application. A block's effects are applied exactly once; `revert`
/// reverses them for reorg.
pub trait StateManager: Send + Sync {
    /// Advance state by this block's effects. Must not be called twice for
    /// the same block without an intervening `revert`.
    fn apply(&self, block: &Block) -> Result<(), StateError>;

    /// Reverse this block's effects, in preparation for a reorg. `block`
    /// must be the most recently applied block.
    fn revert(&self, block: &Block) -> Result<(), StateError>;

    /// Current balance of `address`; zero if the address has never been
    /// credited or debited.
    fn balance(&self, address: &Address) -> FixedPoint;

    /// A verifiable digest of the current materialized state: sorted
    /// balances, total supply, fees collected, and the last applied block.
    fn snapshot(&self) -> StateSnapshot;

    /// Recompute state from the chain store from genesis and compare
    /// against the materialized view's state root. Returns `Ok(true)` iff
    /// they match.
    fn verify(&self, chain_store: &dyn qc_chain_store::ChainStore) -> Result<bool, StateError>;
}
