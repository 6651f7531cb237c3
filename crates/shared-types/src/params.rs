//! Consensus parameters shared across validator, PoRW, PoRS, and the
//! consensus driver (spec.md §4.6-§4.10). Kept in one place so every
//! subsystem that checks a threshold agrees on the same numbers without
//! importing each other.

use serde::{Deserialize, Serialize};

use crate::FixedPoint;

/// Network-wide consensus-critical parameters. All nodes validating the
/// same chain must run with identical values; these are not negotiated
/// over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusParams {
    /// Minimum fee a transaction must carry to be admitted or included.
    pub min_fee: FixedPoint,

    /// Minimum acceptable `porw_proof.score`, retuned per epoch so the
    /// realized inter-PoRW interval tracks `porw_target_interval_secs`.
    pub porw_score_threshold: f64,
    /// Tolerance band for re-scoring a submitted structure against its
    /// reported score.
    pub porw_score_epsilon: f64,
    /// Target mean seconds between PoRW blocks (`T_target`).
    pub porw_target_interval_secs: u64,
    /// Annual inflation target (`π`), e.g. `0.02` for 2%.
    pub porw_annual_inflation: f64,
    /// Seconds in a year, for the reward formula's `B_base` derivation.
    pub porw_year_seconds: u64,
    /// `clamp(Δt / T_target, min_factor, max_factor)` lower bound.
    pub porw_reward_min_factor: f64,
    /// `clamp(Δt / T_target, min_factor, max_factor)` upper bound.
    pub porw_reward_max_factor: f64,

    /// Number of distinct quorum signatures a PoRS block's proof must
    /// carry (default `⌈2f/3⌉+1`).
    pub pors_quorum_size: usize,
    /// Default chunk size in bytes for storage splitting.
    pub pors_chunk_size_bytes: usize,
    /// Required replica count per chunk (default 3; 1 in bootstrap mode).
    pub pors_replication_factor: usize,
    /// Floor below which re-replication is scheduled; always `<=
    /// pors_replication_factor` (the target a scheduled re-replication
    /// restores to).
    pub pors_min_replication: usize,
    /// Minimum byte-index count for a "sample" challenge.
    pub pors_sample_min_indices: usize,
    /// EWMA reliability score below which a peer is considered
    /// unreliable for a given chunk.
    pub pors_verification_threshold: f64,
    /// Smoothing factor for the reliability EWMA (weight on the newest
    /// sample; `0 < alpha <= 1`).
    pub pors_ewma_alpha: f64,
    /// Fixed cadence, in seconds, at which the consensus driver attempts
    /// to produce a new PoRS block (`T_pors`).
    pub pors_block_interval_secs: u64,

    /// Minimum desired connected-peer count; below this, discovery runs
    /// more aggressively.
    pub p2p_min_peers: usize,
    /// Hard cap on connected peers.
    pub p2p_max_peers: usize,
    /// Starting reputation score assigned to a newly connected peer.
    pub p2p_initial_reputation: u8,
    /// Reputation floor; a peer at or below this is banned.
    pub p2p_ban_threshold: u8,
    /// Base ban duration in seconds (doubles per repeat offense up to
    /// `p2p_ban_max_secs`).
    pub p2p_ban_base_secs: u64,
    /// Ban duration ceiling in seconds.
    pub p2p_ban_max_secs: u64,

    /// Blocks between reorg-barrier checkpoints.
    pub checkpoint_interval: u64,
    /// Reorg depth above which the new branch is rejected outright.
    pub max_reorg_depth: u64,
    /// Weight `alpha` applied to summed PoRS quorum weight in the fork
    /// choice score `Σ minted_amount + alpha · Σ quorum_weight`.
    pub fork_choice_alpha: f64,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            min_fee: FixedPoint(1000), // 0.00001000
            porw_score_threshold: 0.75,
            porw_score_epsilon: 0.01,
            porw_target_interval_secs: 600,
            porw_annual_inflation: 0.02,
            porw_year_seconds: 365 * 24 * 3600,
            porw_reward_min_factor: 0.25,
            porw_reward_max_factor: 4.0,
            pors_quorum_size: 1, // single-node bootstrap default; raised by config in multi-peer networks
            pors_chunk_size_bytes: 1024 * 1024,
            pors_replication_factor: 3,
            pors_min_replication: 2,
            pors_sample_min_indices: 128,
            pors_verification_threshold: 0.8,
            pors_ewma_alpha: 0.2,
            pors_block_interval_secs: 60,
            p2p_min_peers: 8,
            p2p_max_peers: 64,
            p2p_initial_reputation: 100,
            p2p_ban_threshold: 0,
            p2p_ban_base_secs: 3600,
            p2p_ban_max_secs: 24 * 3600,
            checkpoint_interval: 1000,
            max_reorg_depth: 100,
            fork_choice_alpha: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_internally_consistent() {
        let params = ConsensusParams::default();
        assert!(params.porw_reward_min_factor < params.porw_reward_max_factor);
        assert!(params.pors_quorum_size >= 1);
        assert!(params.pors_min_replication <= params.pors_replication_factor);
        assert!(params.p2p_min_peers <= params.p2p_max_peers);
        assert!(params.p2p_ban_base_secs <= params.p2p_ban_max_secs);
    }
}
