//! Inbound port: the PoRW engine contract the consensus driver depends on.

use shared_types::{ConsensusParams, FixedPoint, Hash, PorwProof};

use crate::domain::errors::PorwError;
use crate::domain::target::FoldingTarget;

/// Selects folding targets, turns a completed simulation into a proof +
/// minted amount, and re-derives the acceptance contract for a proof
/// submitted by someone else. Does not assemble a full `Block` — the
/// consensus driver owns chain position and header hashing.
#[async_trait::async_trait]
pub trait PorwEngine: Send + Sync {
    /// Pick the next folding target from the configured scorer.
    fn select_target(&self) -> Result<FoldingTarget, PorwError>;

    /// Score a completed structure, building the full proof and the
    /// policy-mandated `minted_amount` for the block that will carry it.
    async fn produce_proof(
        &self,
        folding_params_hash: Hash,
        coordinates: Vec<u8>,
        last_porw_timestamp: Option<u64>,
        timestamp: u64,
    ) -> Result<(PorwProof, FixedPoint, Hash), PorwError>;

    /// Re-derive and check every part of the acceptance contract for a
    /// proof submitted by a peer, against this engine's current minimum
    /// score and the structure it claims to describe.
    async fn verify_submitted_proof(
        &self,
        coordinates: &[u8],
        folding_params_hash: Hash,
        declared_protein_data_ref: Hash,
        proof: &PorwProof,
    ) -> Result<(), PorwError>;

    /// Current minimum acceptable score (this engine's difficulty).
    fn current_min_score(&self) -> f64;

    /// Retune the minimum score against the realized mean inter-PoRW
    /// interval observed over the last epoch.
    fn retune_difficulty(&self, mean_observed_interval_secs: f64);

    /// Consensus parameters this engine is operating under.
    fn params(&self) -> &ConsensusParams;
}
