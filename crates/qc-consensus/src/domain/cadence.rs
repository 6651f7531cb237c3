//! PoRS block production cadence (spec.md §4.10): "one block per
//! `T_pors` seconds."

/// Whether enough time has elapsed since the last PoRS block to attempt
/// producing another.
#[must_use]
pub fn pors_due(last_pors_timestamp: u64, now: u64, interval_secs: u64) -> bool {
    now.saturating_sub(last_pors_timestamp) >= interval_secs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_due_before_interval_elapses() {
        assert!(!pors_due(1_000, 1_030, 60));
    }

    #[test]
    fn due_once_interval_elapses() {
        assert!(pors_due(1_000, 1_060, 60));
        assert!(pors_due(1_000, 2_000, 60));
    }
}
