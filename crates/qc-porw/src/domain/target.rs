//! Folding target selection (spec.md §4.7): the core's contract with the
//! external scientific scorer is only that candidate targets carry a
//! stable identifier and an expected-difficulty tag — the ranking
//! heuristic itself lives entirely outside this node.

use shared_types::Hash;

/// A candidate folding target as reported by the external scorer.
#[derive(Debug, Clone, PartialEq)]
pub struct FoldingTarget {
    /// Stable identifier for the structure to fold.
    pub identifier: Hash,
    /// Expected difficulty tag assigned by the external scorer; used only
    /// to pick among already-ranked candidates, never recomputed here.
    pub expected_difficulty: f64,
}

/// Pick the best candidate from an already best-first ranked list. The
/// list's ordering is the scorer's responsibility; this engine never
/// re-ranks it.
#[must_use]
pub fn select_target(ranked: &[FoldingTarget]) -> Option<FoldingTarget> {
    ranked.first().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_first_ranked_target() {
        let targets = vec![
            FoldingTarget { identifier: [1u8; 32], expected_difficulty: 0.9 },
            FoldingTarget { identifier: [2u8; 32], expected_difficulty: 0.5 },
        ];
        assert_eq!(select_target(&targets).unwrap().identifier, [1u8; 32]);
    }

    #[test]
    fn empty_ranking_yields_no_target() {
        assert!(select_target(&[]).is_none());
    }
}
