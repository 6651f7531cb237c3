//! Folding-result validation contract (spec.md §4.7): a proof is
//! acceptable iff the declared input identifier resolves to the
//! content-addressed reference, the reported score clears the minimum
//! quality threshold, re-scoring reproduces that score within ±ε, and any
//! attached ZK attestation verifies.

use qc_compute::{ComputeEngine, FoldingCandidate, ScoredStructure};
use sha2::{Digest, Sha256};
use shared_types::Hash;

use super::errors::PorwError;

/// Content-addressed identifier for a folding candidate: SHA-256 over the
/// raw coordinate payload and the folding parameter hash. This is
/// consensus-critical (stored as `protein_data_ref` in every PoRW block),
/// so it uses the same algorithm as `shared-crypto::canonical`, not the
/// BLAKE3 hasher reserved for non-consensus gossip dedup.
#[must_use]
pub fn protein_data_ref(coordinates: &[u8], folding_params_hash: Hash) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(coordinates);
    hasher.update(folding_params_hash);
    hasher.finalize().into()
}

/// Re-derive every part of the acceptance contract for a submitted proof.
/// Returns the backend's re-scoring output on success so the caller can
/// log or persist it alongside the accepted proof.
pub async fn verify_folding_proof(
    engine: &dyn ComputeEngine,
    candidate: &FoldingCandidate,
    claimed_score: f64,
    declared_protein_data_ref: Hash,
    attestation: Option<&[u8]>,
    min_score: f64,
    epsilon: f64,
) -> Result<ScoredStructure, PorwError> {
    let recomputed_ref = protein_data_ref(&candidate.coordinates, candidate.folding_params_hash);
    if recomputed_ref != declared_protein_data_ref || recomputed_ref != candidate.protein_data_ref {
        return Err(PorwError::InputIdentifierMismatch);
    }

    if claimed_score < min_score {
        return Err(PorwError::ScoreBelowThreshold { score: claimed_score, threshold: min_score });
    }

    let rescored = engine.score_structure(candidate).await?;
    if (rescored.score - claimed_score).abs() > epsilon {
        return Err(PorwError::ScoreDivergence { claimed: claimed_score, rescored: rescored.score, epsilon });
    }

    if let Some(attestation) = attestation {
        let ok = engine.verify_zk_attestation(candidate, claimed_score, attestation).await?;
        if !ok {
            return Err(PorwError::InvalidAttestation);
        }
    }

    Ok(rescored)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protein_data_ref_is_deterministic_and_input_sensitive() {
        let a = protein_data_ref(b"coords-1", [1u8; 32]);
        let b = protein_data_ref(b"coords-1", [1u8; 32]);
        let c = protein_data_ref(b"coords-2", [1u8; 32]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
