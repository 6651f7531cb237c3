//! Quorum aggregation (spec.md §4.8): a PoRS block's proof carries a set
//! of distinct validator signatures over one challenge round. The same
//! `challenge_id` must never be reused across two blocks.

use std::collections::HashSet;

use shared_crypto::Secp256k1PublicKey;
use shared_types::{Hash, QuorumSignature};

use super::errors::PorsError;

/// A signer only counts toward the quorum if its `signature` verifies as
/// a real ECDSA signature by `node_id` over `challenge_id` — otherwise
/// any node could claim a distinct `node_id` with garbage bytes in
/// `signature` and inflate the count without ever having signed anything.
fn is_genuine(challenge_id: &Hash, sig: &QuorumSignature) -> bool {
    Secp256k1PublicKey::from_bytes(*sig.node_id.as_bytes())
        .map(|key| key.verify(challenge_id, &sig.signature).is_ok())
        .unwrap_or(false)
}

/// Verify, deduplicate by signer, then check the result meets
/// `quorum_size`. Rejects the round outright if `challenge_id` has
/// already been bound to an earlier block — the caller's
/// `seen_challenge_ids` set records that commitment.
pub fn aggregate_quorum(
    challenge_id: Hash,
    signatures: Vec<QuorumSignature>,
    quorum_size: usize,
    seen_challenge_ids: &HashSet<Hash>,
) -> Result<Vec<QuorumSignature>, PorsError> {
    if seen_challenge_ids.contains(&challenge_id) {
        return Err(PorsError::ChallengeIdReused);
    }

    let mut by_signer: std::collections::BTreeMap<[u8; 33], QuorumSignature> = std::collections::BTreeMap::new();
    for sig in signatures {
        if !is_genuine(&challenge_id, &sig) {
            continue;
        }
        by_signer.entry(*sig.node_id.as_bytes()).or_insert(sig);
    }
    let distinct: Vec<QuorumSignature> = by_signer.into_values().collect();

    if distinct.len() < quorum_size {
        return Err(PorsError::QuorumNotMet { have: distinct.len(), need: quorum_size });
    }
    Ok(distinct)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::Secp256k1KeyPair;
    use shared_types::PublicKey;

    fn sig(challenge_id: &Hash, seed: u8) -> QuorumSignature {
        let keypair = Secp256k1KeyPair::from_bytes([seed; 32]).expect("valid seed");
        let signature = keypair.sign(challenge_id);
        QuorumSignature { node_id: PublicKey(*keypair.public_key().as_bytes()), signature }
    }

    fn forged_sig(seed: u8) -> QuorumSignature {
        let keypair = Secp256k1KeyPair::from_bytes([seed; 32]).expect("valid seed");
        QuorumSignature { node_id: PublicKey(*keypair.public_key().as_bytes()), signature: vec![1, 2, 3] }
    }

    #[test]
    fn accepts_when_distinct_genuine_signer_count_meets_quorum() {
        let challenge_id = [1u8; 32];
        let seen = HashSet::new();
        let result = aggregate_quorum(
            challenge_id,
            vec![sig(&challenge_id, 1), sig(&challenge_id, 2), sig(&challenge_id, 3)],
            2,
            &seen,
        );
        assert_eq!(result.unwrap().len(), 3);
    }

    #[test]
    fn duplicate_signers_do_not_count_twice() {
        let challenge_id = [1u8; 32];
        let seen = HashSet::new();
        let result = aggregate_quorum(challenge_id, vec![sig(&challenge_id, 1), sig(&challenge_id, 1)], 2, &seen);
        assert!(matches!(result, Err(PorsError::QuorumNotMet { have: 1, need: 2 })));
    }

    #[test]
    fn forged_signatures_do_not_count_toward_quorum() {
        let challenge_id = [1u8; 32];
        let seen = HashSet::new();
        let result = aggregate_quorum(
            challenge_id,
            vec![sig(&challenge_id, 1), forged_sig(2), forged_sig(3)],
            2,
            &seen,
        );
        assert!(matches!(result, Err(PorsError::QuorumNotMet { have: 1, need: 2 })));
    }

    #[test]
    fn signature_over_a_different_challenge_id_does_not_count() {
        let challenge_id = [1u8; 32];
        let other_round = [2u8; 32];
        let seen = HashSet::new();
        let result = aggregate_quorum(challenge_id, vec![sig(&other_round, 1)], 1, &seen);
        assert!(matches!(result, Err(PorsError::QuorumNotMet { have: 0, need: 1 })));
    }

    #[test]
    fn reused_challenge_id_is_rejected() {
        let challenge_id = [9u8; 32];
        let mut seen = HashSet::new();
        seen.insert(challenge_id);
        let result = aggregate_quorum(challenge_id, vec![sig(&challenge_id, 1)], 1, &seen);
        assert!(matches!(result, Err(PorsError::ChallengeIdReused)));
    }
}
