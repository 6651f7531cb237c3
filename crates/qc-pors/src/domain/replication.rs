//! Replication control (spec.md §4.8): when a chunk's observed replica
//! count drops below `min_replication`, schedule re-replication toward
//! `target_replication_factor`. Failed replication attempts back off
//! exponentially; persistent failure bans the offending peer.

/// What the engine decided to do about a chunk's replica count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicationDecision {
    /// Replica count is at or above the floor; no action needed.
    Healthy,
    /// Replica count is below the floor; re-replicate up to `target`.
    Schedule { target: usize },
}

/// Decide whether a chunk needs re-replication given its observed replica
/// count.
#[must_use]
pub fn evaluate_replication(observed_replicas: usize, min_replication: usize, target_replication_factor: usize) -> ReplicationDecision {
    if observed_replicas < min_replication {
        ReplicationDecision::Schedule { target: target_replication_factor }
    } else {
        ReplicationDecision::Healthy
    }
}

/// Exponential backoff for a retried replication attempt: `base * 2^attempt`,
/// capped at `max_secs`. `attempt` is zero-indexed (the first retry is
/// `attempt == 0`).
#[must_use]
pub fn backoff_duration_secs(attempt: u32, base_secs: u64, max_secs: u64) -> u64 {
    base_secs.saturating_mul(1u64 << attempt.min(32)).min(max_secs)
}

/// A peer is banned once its consecutive replication-attempt failure
/// count reaches `ban_after_failures`.
#[must_use]
pub fn should_ban_peer(consecutive_failures: u32, ban_after_failures: u32) -> bool {
    consecutive_failures >= ban_after_failures
}
