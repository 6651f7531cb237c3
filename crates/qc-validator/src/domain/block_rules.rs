//! Block validation: spec.md §4.6's block rules, both variants.

use std::collections::HashSet;

use shared_crypto::canonical::canonical_hash;
use shared_crypto::Secp256k1PublicKey;
use shared_types::{Block, BlockHeader, ConsensusParams, FixedPoint, Hash, QuorumSignature};

use super::errors::ValidatorError;
use super::transaction_rules::check_transaction_shape;

/// Canonical hash of a header's fields excluding `block_hash` itself,
/// matching the transaction id convention: the hash covers everything
/// that determines identity except the field that stores the hash.
pub fn canonical_header_hash(header: &BlockHeader, body_digest: Hash) -> Result<Hash, ValidatorError> {
    #[derive(serde::Serialize)]
    struct HeaderBody {
        index: u64,
        previous_hash: Hash,
        timestamp: u64,
        block_type: shared_types::BlockType,
        body_digest: Hash,
    }

    canonical_hash(&HeaderBody {
        index: header.index,
        previous_hash: header.previous_hash,
        timestamp: header.timestamp,
        block_type: header.block_type,
        body_digest,
    })
    .map_err(|e| ValidatorError::MalformedEntity(format!("cannot canonicalize header: {e}")))
}

/// Canonical hash of a block's non-header payload: what the header's
/// `block_hash` ultimately commits to alongside the chain-position fields.
pub fn block_body_digest(block: &Block) -> Result<Hash, ValidatorError> {
    match block {
        Block::PoRW(b) => {
            #[derive(serde::Serialize)]
            struct PorwBody<'a> {
                protein_data_ref: Hash,
                porw_proof: &'a shared_types::PorwProof,
                minted_amount: FixedPoint,
                coinbase: &'a shared_types::Transaction,
            }
            canonical_hash(&PorwBody {
                protein_data_ref: b.protein_data_ref,
                porw_proof: &b.porw_proof,
                minted_amount: b.minted_amount,
                coinbase: &b.coinbase,
            })
        }
        Block::PoRS(b) => {
            #[derive(serde::Serialize)]
            struct PorsBody<'a> {
                transactions: &'a [shared_types::Transaction],
                pors_proof: &'a shared_types::PorsProof,
            }
            canonical_hash(&PorsBody {
                transactions: &b.transactions,
                pors_proof: &b.pors_proof,
            })
        }
    }
    .map_err(|e| ValidatorError::MalformedEntity(format!("cannot canonicalize block body: {e}")))
}

/// Chain-position checks common to both block variants: `previous_hash`
/// matches the current tip, `index` extends it by exactly one, and the
/// recomputed `block_hash` matches what is stored.
pub fn check_chain_position(
    block: &Block,
    tip: Option<&BlockHeader>,
    body_digest: Hash,
) -> Result<(), ValidatorError> {
    let header = block.header();

    let expected_index = tip.map_or(0, |t| t.index + 1);
    if header.index != expected_index {
        return Err(ValidatorError::Conflict(format!(
            "expected index {expected_index}, got {}",
            header.index
        )));
    }

    let expected_previous = tip.map_or([0u8; 32], |t| t.block_hash);
    if header.previous_hash != expected_previous {
        return Err(ValidatorError::Conflict(
            "previous_hash does not match current tip".into(),
        ));
    }

    let recomputed = canonical_header_hash(header, body_digest)?;
    if recomputed != header.block_hash {
        return Err(ValidatorError::MalformedEntity(
            "stored block_hash does not match recomputed hash".into(),
        ));
    }

    Ok(())
}

/// PoRW-specific rules: score threshold, minted amount matches the reward
/// policy for this block's `Δt`, and — as the caller's responsibility —
/// `protein_data_ref` resolvability, which needs the folding-result store
/// and is checked by `qc-porw` before this validator is invoked.
pub fn check_porw_rules(
    score: f64,
    minted_amount: FixedPoint,
    expected_minted_amount: FixedPoint,
    params: &ConsensusParams,
) -> Result<(), ValidatorError> {
    if score < params.porw_score_threshold {
        return Err(ValidatorError::InvalidProof(format!(
            "score {score} below threshold {}",
            params.porw_score_threshold
        )));
    }
    if minted_amount != expected_minted_amount {
        return Err(ValidatorError::InvalidProof(format!(
            "minted_amount {minted_amount} does not match policy output {expected_minted_amount}"
        )));
    }
    Ok(())
}

/// Recompute how many *genuine* distinct signers back a PoRS block's
/// quorum. A `QuorumSignature` only counts if it verifies as a real
/// ECDSA signature by `node_id` over the block's challenge-round
/// identifier (the canonical hash of its `challenge_ids`) — otherwise a
/// forger could submit garbage bytes in `signature` under any number of
/// distinct `node_id`s and satisfy a count-only quorum check.
pub fn genuine_pors_signer_count(
    challenge_ids: &[Hash],
    quorum_signatures: &[QuorumSignature],
) -> Result<usize, ValidatorError> {
    let round_id = canonical_hash(&challenge_ids)
        .map_err(|e| ValidatorError::InvalidProof(format!("cannot hash challenge round id: {e}")))?;

    let mut distinct: HashSet<[u8; 33]> = HashSet::new();
    for sig in quorum_signatures {
        let genuine = Secp256k1PublicKey::from_bytes(*sig.node_id.as_bytes())
            .map(|key| key.verify(&round_id, &sig.signature).is_ok())
            .unwrap_or(false);
        if genuine {
            distinct.insert(*sig.node_id.as_bytes());
        }
    }
    Ok(distinct.len())
}

/// PoRS-specific rules: quorum size over a single challenge round, and
/// `storage_rewards` summing exactly to the block's fee total.
pub fn check_pors_rules(
    distinct_signer_count: usize,
    storage_rewards_total: FixedPoint,
    fee_total: FixedPoint,
    params: &ConsensusParams,
) -> Result<(), ValidatorError> {
    if distinct_signer_count < params.pors_quorum_size {
        return Err(ValidatorError::InvalidProof(format!(
            "quorum {distinct_signer_count} below required {}",
            params.pors_quorum_size
        )));
    }
    if storage_rewards_total != fee_total {
        return Err(ValidatorError::InvalidProof(format!(
            "storage_rewards total {storage_rewards_total} does not match fee total {fee_total}"
        )));
    }
    Ok(())
}

/// Every transaction in a PoRS block's batch must pass its own shape
/// checks and the batch must carry no duplicate ids (double-spend within
/// the same block).
pub fn check_no_intra_block_double_spend(
    transactions: &[shared_types::Transaction],
    params: &ConsensusParams,
) -> Result<(), ValidatorError> {
    let mut seen: HashSet<Hash> = HashSet::with_capacity(transactions.len());
    for tx in transactions {
        check_transaction_shape(tx, params)?;
        if !seen.insert(tx.id) {
            return Err(ValidatorError::Conflict(format!(
                "duplicate transaction {:x?} within block",
                tx.id
            )));
        }
    }
    Ok(())
}
