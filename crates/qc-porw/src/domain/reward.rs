//! Time-adjusted minting and score-threshold difficulty retune (spec.md
//! §4.7).

use shared_types::{ConsensusParams, FixedPoint};

/// `minted_amount = B_base · clamp(Δt / T_target, min_factor, max_factor)`,
/// where `B_base ≈ total_supply · π · T_target / year_seconds`.
///
/// `qc-validator` mirrors this exact formula (see that crate's
/// `service.rs`) so it can check a producer's claimed `minted_amount`
/// without depending on this crate — this is the side both must agree
/// with byte-for-byte.
#[must_use]
pub fn minted_amount(delta_t: u64, total_supply_units: u64, params: &ConsensusParams) -> FixedPoint {
    let base = (total_supply_units as f64) * params.porw_annual_inflation
        * (params.porw_target_interval_secs as f64)
        / (params.porw_year_seconds as f64);
    let factor = (delta_t as f64 / params.porw_target_interval_secs as f64)
        .clamp(params.porw_reward_min_factor, params.porw_reward_max_factor);
    FixedPoint((base * factor).round() as u64)
}

/// Retune the minimum acceptable score so the realized mean inter-PoRW
/// interval tracks `T_target`. Blocks arriving faster than target raise
/// the bar (harder to clear); slower arrivals lower it. The adjustment
/// ratio reuses the reward formula's own clamp bounds rather than
/// introducing a third pair of consensus constants, since both exist to
/// bound how sharply one epoch's observation can swing the next.
#[must_use]
pub fn retune_min_score(mean_observed_interval_secs: f64, current_min_score: f64, params: &ConsensusParams) -> f64 {
    if mean_observed_interval_secs <= 0.0 {
        return current_min_score;
    }
    let ratio = (params.porw_target_interval_secs as f64 / mean_observed_interval_secs)
        .clamp(params.porw_reward_min_factor, params.porw_reward_max_factor);
    (current_min_score * ratio).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_supply_genesis_mint_is_zero() {
        let params = ConsensusParams::default();
        assert_eq!(minted_amount(params.porw_target_interval_secs, 0, &params), FixedPoint::ZERO);
    }

    #[test]
    fn reward_scales_with_delta_t_within_clamp_bounds() {
        let params = ConsensusParams::default();
        let slow = minted_amount(params.porw_target_interval_secs * 2, 1_000_000_000, &params);
        let fast = minted_amount(params.porw_target_interval_secs / 2, 1_000_000_000, &params);
        assert!(slow.0 > fast.0);
    }

    #[test]
    fn faster_than_target_interval_raises_min_score() {
        let params = ConsensusParams::default();
        let observed = params.porw_target_interval_secs as f64 / 2.0;
        let retuned = retune_min_score(observed, 0.5, &params);
        assert!(retuned >= 0.5);
    }

    #[test]
    fn slower_than_target_interval_lowers_min_score() {
        let params = ConsensusParams::default();
        let observed = params.porw_target_interval_secs as f64 * 2.0;
        let retuned = retune_min_score(observed, 0.5, &params);
        assert!(retuned <= 0.5);
    }
}
