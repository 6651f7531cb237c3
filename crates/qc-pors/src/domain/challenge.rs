//! Storage challenges (spec.md §4.8): three challenge types, each
//! producing a deterministically verifiable SHA-256 proof over some
//! portion of the chunk's bytes. Parameters are drawn at random so a
//! prover cannot precompute and cache a single answer for a chunk.

use rand::Rng;
use sha2::{Digest, Sha256};
use shared_types::Hash;

use super::errors::PorsError;

/// Which slice of the chunk a challenge asks the prover to hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeKind {
    /// Prove knowledge of the whole chunk.
    Hash,
    /// Prove knowledge of the byte range `[start, end)`.
    Range { start: usize, end: usize },
    /// Prove knowledge of the bytes at these indices, in order.
    Sample { indices: Vec<usize> },
}

/// A challenge round: `(challenge_id, chunk_id, kind, timestamp)`. The
/// `challenge_id` is a fresh, non-reused identifier for the round —
/// quorum aggregation rejects any `challenge_id` already bound to a prior
/// block.
#[derive(Debug, Clone, PartialEq)]
pub struct Challenge {
    pub challenge_id: Hash,
    pub chunk_id: Hash,
    pub kind: ChallengeKind,
    pub timestamp: u64,
}

/// Draw a fresh random challenge of the requested shape for `chunk_id`,
/// whose underlying chunk is `chunk_len` bytes long. `min_sample_indices`
/// is the policy-mandated floor on how many positions a `Sample`
/// challenge must cover (spec.md §4.8: "uniformly random index sets of
/// >= 128 positions").
pub fn generate_challenge(
    rng: &mut impl Rng,
    chunk_id: Hash,
    chunk_len: usize,
    requested_kind: ChallengeKindRequest,
    min_sample_indices: usize,
    timestamp: u64,
) -> Result<Challenge, PorsError> {
    if chunk_len == 0 {
        return Err(PorsError::EmptyChunk);
    }

    let kind = match requested_kind {
        ChallengeKindRequest::Hash => ChallengeKind::Hash,
        ChallengeKindRequest::Range => {
            if chunk_len < 2 {
                return Err(PorsError::ChunkTooSmallForChallenge);
            }
            let start = rng.gen_range(0..chunk_len - 1);
            let end = rng.gen_range((start + 1)..=chunk_len);
            ChallengeKind::Range { start, end }
        }
        ChallengeKindRequest::Sample => {
            let count = min_sample_indices.min(chunk_len).max(1);
            if chunk_len < count {
                return Err(PorsError::ChunkTooSmallForChallenge);
            }
            let mut indices: Vec<usize> = (0..chunk_len).collect();
            // Partial Fisher-Yates: shuffle only as many positions as we need.
            for i in 0..count {
                let j = rng.gen_range(i..chunk_len);
                indices.swap(i, j);
            }
            let mut chosen: Vec<usize> = indices[..count].to_vec();
            chosen.sort_unstable();
            ChallengeKind::Sample { indices: chosen }
        }
    };

    let challenge_id = challenge_identifier(rng, chunk_id, &kind, timestamp);
    Ok(Challenge { challenge_id, chunk_id, kind, timestamp })
}

/// Which kind of challenge to draw; callers pick the kind, the domain
/// picks the randomized parameters within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeKindRequest {
    Hash,
    Range,
    Sample,
}

fn challenge_identifier(rng: &mut impl Rng, chunk_id: Hash, kind: &ChallengeKind, timestamp: u64) -> Hash {
    let mut nonce = [0u8; 16];
    rng.fill(&mut nonce);
    let mut hasher = Sha256::new();
    hasher.update(b"qc-pors-challenge-v1");
    hasher.update(chunk_id);
    hasher.update(timestamp.to_le_bytes());
    hasher.update(&nonce);
    match kind {
        ChallengeKind::Hash => hasher.update([0u8]),
        ChallengeKind::Range { start, end } => {
            hasher.update([1u8]);
            hasher.update(start.to_le_bytes());
            hasher.update(end.to_le_bytes());
        }
        ChallengeKind::Sample { indices } => {
            hasher.update([2u8]);
            for idx in indices {
                hasher.update(idx.to_le_bytes());
            }
        }
    }
    hasher.finalize().into()
}

/// Compute the expected proof for `challenge` against the authoritative
/// chunk bytes. Both prover and verifier run this; a prover without the
/// bytes cannot reproduce the output.
pub fn expected_proof(chunk_bytes: &[u8], challenge: &Challenge) -> Result<Hash, PorsError> {
    let mut hasher = Sha256::new();
    match &challenge.kind {
        ChallengeKind::Hash => {
            hasher.update(chunk_bytes);
        }
        ChallengeKind::Range { start, end } => {
            let slice = chunk_bytes
                .get(*start..*end)
                .ok_or(PorsError::ChallengeParamsOutOfRange)?;
            hasher.update(slice);
        }
        ChallengeKind::Sample { indices } => {
            for &idx in indices {
                let byte = chunk_bytes.get(idx).ok_or(PorsError::ChallengeParamsOutOfRange)?;
                hasher.update([*byte]);
            }
        }
    }
    Ok(hasher.finalize().into())
}

/// Check a prover's `(challenge_id, chunk_id, proof)` response against the
/// expected proof recomputed from the verifier's own authoritative copy.
pub fn verify_response(
    chunk_bytes: &[u8],
    challenge: &Challenge,
    response_challenge_id: Hash,
    response_proof: Hash,
) -> Result<bool, PorsError> {
    if response_challenge_id != challenge.challenge_id {
        return Err(PorsError::ChallengeIdMismatch);
    }
    let expected = expected_proof(chunk_bytes, challenge)?;
    Ok(expected == response_proof)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> rand::rngs::StdRng {
        rand::rngs::StdRng::seed_from_u64(42)
    }

    #[test]
    fn hash_challenge_accepts_correct_proof_and_rejects_wrong_data() {
        let data = b"authoritative chunk bytes".to_vec();
        let mut r = rng();
        let challenge =
            generate_challenge(&mut r, [1u8; 32], data.len(), ChallengeKindRequest::Hash, 128, 100).unwrap();

        let proof = expected_proof(&data, &challenge).unwrap();
        assert!(verify_response(&data, &challenge, challenge.challenge_id, proof).unwrap());

        let wrong_data = b"tampered chunk bytes------".to_vec();
        assert!(!verify_response(&wrong_data, &challenge, challenge.challenge_id, proof).unwrap());
    }

    #[test]
    fn range_challenge_params_stay_within_bounds() {
        let data = vec![0xABu8; 64];
        let mut r = rng();
        let challenge =
            generate_challenge(&mut r, [2u8; 32], data.len(), ChallengeKindRequest::Range, 8, 1).unwrap();
        match challenge.kind {
            ChallengeKind::Range { start, end } => {
                assert!(start < end);
                assert!(end <= data.len());
            }
            _ => panic!("expected a range challenge"),
        }
    }

    #[test]
    fn sample_challenge_draws_at_least_the_configured_floor() {
        let data = vec![1u8; 256];
        let mut r = rng();
        let challenge =
            generate_challenge(&mut r, [3u8; 32], data.len(), ChallengeKindRequest::Sample, 128, 1).unwrap();
        match challenge.kind {
            ChallengeKind::Sample { indices } => {
                assert!(indices.len() >= 128);
                assert!(indices.windows(2).all(|w| w[0] < w[1]), "indices should be deduplicated and sorted");
            }
            _ => panic!("expected a sample challenge"),
        }
    }

    #[test]
    fn mismatched_challenge_id_is_rejected() {
        let data = b"abc".to_vec();
        let challenge = Challenge { challenge_id: [1u8; 32], chunk_id: [2u8; 32], kind: ChallengeKind::Hash, timestamp: 0 };
        let proof = expected_proof(&data, &challenge).unwrap();
        let result = verify_response(&data, &challenge, [9u8; 32], proof);
        assert!(matches!(result, Err(PorsError::ChallengeIdMismatch)));
    }
}
