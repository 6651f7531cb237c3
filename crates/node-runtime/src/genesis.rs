//! Genesis block construction (spec.md §6): a single block at `index=0`
//! with `previous_hash=""` (the all-zero hash), a zeroed coinbase
//! transaction, and `total_supply=0`. The network id and consensus
//! parameters that every other node must agree on are pinned alongside it
//! rather than carried in the block itself.

use shared_crypto::CryptoError;
use shared_types::{
    Address, Block, BlockHeader, BlockType, ConsensusParams, FixedPoint, Hash, PorwBlock, PorwProof,
    Transaction, TransactionStatus, ZERO_ADDRESS,
};

/// Genesis metadata pinned alongside the block: the network id every
/// `HELLO` handshake checks against, and the consensus parameters every
/// validating node must run with identical values.
#[derive(Debug, Clone)]
pub struct GenesisMetadata {
    pub network_id: String,
    pub consensus_params: ConsensusParams,
}

fn zero_coinbase(timestamp: u64) -> Transaction {
    let zero = Address::new_unchecked(ZERO_ADDRESS.to_string());
    Transaction {
        id: [0u8; 32],
        sender: zero.clone(),
        recipient: zero,
        amount: Some(FixedPoint::ZERO),
        fee: FixedPoint::ZERO,
        timestamp,
        signature: None,
        memo: None,
        confidential_data: None,
        status: TransactionStatus::Confirmed,
    }
}

/// Build the genesis `PoRW` block: `index=0`, empty `previous_hash`, a
/// zeroed coinbase, `minted_amount=0`. The stored `block_hash` is computed
/// with the same canonical rule every other block uses, so genesis
/// verifies under `qc_validator::check_chain_position` like any other
/// block — it is not a special-cased exception to consensus hashing.
pub fn build_genesis(timestamp: u64) -> Result<Block, CryptoError> {
    let mut coinbase = zero_coinbase(timestamp);
    coinbase.id = qc_validator::canonical_body_hash(&coinbase)
        .map_err(|e| CryptoError::InvalidInput(format!("cannot hash genesis coinbase: {e}")))?;

    let mut block = Block::PoRW(PorwBlock {
        header: BlockHeader {
            index: 0,
            previous_hash: [0u8; 32],
            timestamp,
            block_hash: [0u8; 32],
            block_type: BlockType::PoRW,
        },
        protein_data_ref: [0u8; 32],
        porw_proof: PorwProof { folding_params_hash: [0u8; 32], score: 0.0, energy: 0.0, rmsd: 0.0, zk_attestation: None },
        minted_amount: FixedPoint::ZERO,
        coinbase,
    });

    let body_digest = qc_validator::block_body_digest(&block).map_err(|e| {
        CryptoError::InvalidInput(format!("cannot digest genesis body: {e}"))
    })?;
    let header_hash = qc_validator::canonical_header_hash(block.header(), body_digest).map_err(|e| {
        CryptoError::InvalidInput(format!("cannot hash genesis header: {e}"))
    })?;

    if let Block::PoRW(ref mut b) = block {
        b.header.block_hash = header_hash;
    }
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genesis_hash(timestamp: u64) -> Result<Hash, CryptoError> {
        Ok(build_genesis(timestamp)?.block_hash())
    }

    #[test]
    fn genesis_has_index_zero_and_empty_previous_hash() {
        let block = build_genesis(0).expect("build genesis");
        assert_eq!(block.index(), 0);
        assert_eq!(block.previous_hash(), [0u8; 32]);
    }

    #[test]
    fn genesis_hash_is_deterministic_for_a_fixed_timestamp() {
        let a = genesis_hash(1_700_000_000).expect("hash a");
        let b = genesis_hash(1_700_000_000).expect("hash b");
        assert_eq!(a, b);
    }

    #[test]
    fn genesis_coinbase_mints_nothing() {
        let block = build_genesis(0).expect("build genesis");
        match block {
            Block::PoRW(b) => {
                assert_eq!(b.minted_amount, FixedPoint::ZERO);
                assert!(b.coinbase.sender.is_zero());
                assert!(b.coinbase.signature.is_none());
            }
            Block::PoRS(_) => panic!("genesis must be a PoRW block"),
        }
    }

    #[test]
    fn genesis_passes_chain_position_validation() {
        let block = build_genesis(0).expect("build genesis");
        let body_digest = qc_validator::block_body_digest(&block).expect("digest");
        let recomputed = qc_validator::canonical_header_hash(block.header(), body_digest).expect("hash");
        assert_eq!(recomputed, block.block_hash());
    }
}
