//! Per-node reliability scoring (spec.md §4.8): an exponentially weighted
//! fraction of successful challenges over a sliding window. A node is
//! reliable once its score clears `verification_threshold` (default 0.8).

/// Fold one more challenge outcome into the running score:
/// `score' = alpha * observation + (1 - alpha) * score`, where
/// `observation` is `1.0` on success and `0.0` on failure.
#[must_use]
pub fn ewma_update(previous_score: f64, success: bool, alpha: f64) -> f64 {
    let observation = if success { 1.0 } else { 0.0 };
    (alpha * observation + (1.0 - alpha) * previous_score).clamp(0.0, 1.0)
}

/// Whether a score clears the reliability bar.
#[must_use]
pub fn is_reliable(score: f64, verification_threshold: f64) -> bool {
    score >= verification_threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_successes_converge_toward_one() {
        let mut score = 0.5;
        for _ in 0..50 {
            score = ewma_update(score, true, 0.2);
        }
        assert!(score > 0.99);
    }

    #[test]
    fn repeated_failures_converge_toward_zero() {
        let mut score = 0.5;
        for _ in 0..50 {
            score = ewma_update(score, false, 0.2);
        }
        assert!(score < 0.01);
    }

    #[test]
    fn single_failure_lowers_score_proportionally_to_alpha() {
        let before = 0.9;
        let after = ewma_update(before, false, 0.2);
        assert!((after - 0.72).abs() < 1e-9);
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        assert!(is_reliable(0.8, 0.8));
        assert!(!is_reliable(0.79, 0.8));
    }
}
