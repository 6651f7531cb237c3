//! Inbound port: the consensus driver contract node-runtime depends on.

use shared_types::Block;

use crate::domain::errors::ConsensusError;
use crate::domain::outcome::BlockOutcome;

/// Drives the validate/apply/reorg flow for blocks arriving from gossip
/// or local production, per spec.md §4.10. Does not itself open sockets
/// or publish bus events — the caller decides what to gossip based on the
/// returned [`BlockOutcome`].
pub trait ConsensusDriver: Send + Sync {
    /// Handle a block received from a peer or produced locally: validate
    /// it, apply it if it extends the tip, buffer it as an orphan if it
    /// doesn't yet connect, or reorg onto it if it roots a heavier branch
    /// than the current one.
    fn on_block_received(&self, block: Block) -> Result<BlockOutcome, ConsensusError>;

    /// The most recently committed checkpoint index (0 before the chain
    /// has reached the first one).
    fn last_checkpoint_index(&self) -> u64;

    /// Whether it has been at least `pors_block_interval_secs` since the
    /// last PoRS block, i.e. whether the driver should be asked to
    /// assemble and submit a new one.
    fn pors_production_due(&self, now: u64) -> Result<bool, ConsensusError>;
}
