//! Cumulative-work scoring for fork choice (spec.md §4.10): "total
//! `minted_amount` plus scaled PoRS quorum weight."
//!
//! Unlike a stake-weighted GHOST tree, branch weight here is a plain sum
//! over the candidate branch's own blocks — there is no attestation
//! gossip to fold in, so the comparison is a single pass over each
//! branch's blocks rather than a cached weight propagated up a block
//! tree.

use shared_types::Block;

/// A single block's contribution to its branch's cumulative work: a PoRW
/// block contributes its `minted_amount` (in base units); a PoRS block
/// contributes `alpha` times its quorum's distinct signer count.
#[must_use]
pub fn block_work(block: &Block, alpha: f64) -> f64 {
    match block {
        Block::PoRW(b) => b.minted_amount.0 as f64,
        Block::PoRS(b) => alpha * b.pors_proof.quorum_signatures.len() as f64,
    }
}

/// Sum of `block_work` over every block in a candidate branch, ordered
/// from the fork point (exclusive) to the branch tip (inclusive).
#[must_use]
pub fn cumulative_work<'a>(blocks: impl IntoIterator<Item = &'a Block>, alpha: f64) -> f64 {
    blocks.into_iter().map(|b| block_work(b, alpha)).sum()
}

/// Whether `candidate` should replace `current` as the canonical branch:
/// strictly greater cumulative work wins; ties keep the incumbent so a
/// node never reorgs onto a branch it cannot show is heavier.
#[must_use]
pub fn candidate_wins(candidate_work: f64, current_work: f64) -> bool {
    candidate_work > current_work
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{BlockHeader, BlockType, FixedPoint, PorsBlock, PorsProof, PorwBlock, PorwProof, PublicKey, QuorumSignature};

    fn header(index: u64, block_type: BlockType) -> BlockHeader {
        BlockHeader { index, previous_hash: [0u8; 32], timestamp: index, block_hash: [index as u8; 32], block_type }
    }

    fn porw_block(index: u64, minted: u64) -> Block {
        Block::PoRW(PorwBlock {
            header: header(index, BlockType::PoRW),
            protein_data_ref: [1u8; 32],
            porw_proof: PorwProof { folding_params_hash: [2u8; 32], score: 0.9, energy: -1.0, rmsd: 0.5, zk_attestation: None },
            minted_amount: FixedPoint(minted),
            coinbase: sample_coinbase(),
        })
    }

    fn pors_block(index: u64, signer_count: usize) -> Block {
        let quorum_signatures = (0..signer_count)
            .map(|i| QuorumSignature { node_id: PublicKey([i as u8; 33]), signature: vec![0u8; 64] })
            .collect();
        Block::PoRS(PorsBlock {
            header: header(index, BlockType::PoRS),
            transactions: vec![],
            pors_proof: PorsProof { challenge_ids: vec![], quorum_signatures, storage_rewards: Default::default() },
        })
    }

    fn sample_coinbase() -> shared_types::Transaction {
        shared_types::Transaction {
            id: [0u8; 32],
            sender: shared_types::Address::new_unchecked(shared_types::ZERO_ADDRESS.to_string()),
            recipient: shared_types::Address::new_unchecked(shared_types::ZERO_ADDRESS.to_string()),
            amount: Some(FixedPoint(0)),
            fee: FixedPoint::ZERO,
            timestamp: 0,
            signature: None,
            memo: None,
            confidential_data: None,
            status: shared_types::TransactionStatus::Confirmed,
        }
    }

    #[test]
    fn porw_work_equals_minted_amount() {
        assert_eq!(block_work(&porw_block(1, 5_000), 1.0), 5_000.0);
    }

    #[test]
    fn pors_work_is_alpha_scaled_signer_count() {
        assert_eq!(block_work(&pors_block(1, 4), 2.0), 8.0);
    }

    #[test]
    fn cumulative_work_sums_mixed_branch() {
        let branch = vec![porw_block(1, 1_000), pors_block(2, 3), porw_block(3, 2_000)];
        let total = cumulative_work(branch.iter(), 1.0);
        assert_eq!(total, 3_003.0);
    }

    #[test]
    fn heavier_branch_with_fewer_blocks_can_still_win() {
        let light_but_long = vec![pors_block(1, 1), pors_block(2, 1), pors_block(3, 1)];
        let heavy_but_short = vec![porw_block(1, 10_000)];
        let alpha = 1.0;
        assert!(candidate_wins(
            cumulative_work(heavy_but_short.iter(), alpha),
            cumulative_work(light_but_long.iter(), alpha)
        ));
    }

    #[test]
    fn tie_does_not_win() {
        assert!(!candidate_wins(100.0, 100.0));
    }
}
