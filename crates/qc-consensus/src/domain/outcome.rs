//! What came of handing a block to the consensus driver — enough for
//! the caller to decide what, if anything, to gossip and log.

use shared_types::Hash;

/// Result of [`crate::ports::ConsensusDriver::on_block_received`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockOutcome {
    /// The block extended the current tip directly and was applied.
    Extended { index: u64, hash: Hash },

    /// A competing branch overtook the current tip on cumulative work; the
    /// old branch was reverted back to `fork_point_index` and the winning
    /// branch applied up to `new_tip_hash`.
    Reorganized { fork_point_index: u64, new_tip_index: u64, new_tip_hash: Hash, reverted: Vec<Hash>, applied: Vec<Hash> },

    /// The block doesn't extend the current tip and isn't (yet) heavier
    /// than it; held in case more of its branch arrives.
    BufferedAsOrphan,

    /// Already stored; a no-op re-delivery.
    Duplicate,
}
