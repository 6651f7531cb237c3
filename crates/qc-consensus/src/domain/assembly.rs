//! Block header assembly: chain position (`index`/`previous_hash`) plus
//! the header hash, re-derived with the exact same fields
//! `qc_validator::domain::block_rules::check_chain_position` will recompute
//! when this block comes back around for validation.
//!
//! `qc-validator`'s own header-hash helper is private to that crate (it is
//! only ever the *checker* of a hash someone else already produced), so
//! the one producer that needs to mint a fresh, matching hash — this
//! crate — carries its own copy rather than exposing validator internals
//! outward. Mirrors the reward-formula duplication already established
//! between `qc-porw` and `qc-validator`: the two sides must stay
//! byte-for-byte identical, not import one another.

use shared_crypto::canonical::canonical_hash;
use shared_types::{BlockHeader, BlockType, Hash};

use super::errors::ConsensusError;

/// Chain-position fields (`index`, `previous_hash`) for a block extending
/// `tip`.
#[must_use]
pub fn next_position(tip: Option<&BlockHeader>) -> (u64, Hash) {
    let index = tip.map_or(0, |t| t.index + 1);
    let previous_hash = tip.map_or([0u8; 32], |t| t.block_hash);
    (index, previous_hash)
}

/// Build a complete header extending `tip`, with `block_hash` computed
/// over exactly the fields `check_chain_position` re-derives: `index`,
/// `previous_hash`, `timestamp`, `block_type`, and the body digest.
pub fn assemble_header(
    tip: Option<&BlockHeader>,
    timestamp: u64,
    block_type: BlockType,
    body_digest: Hash,
) -> Result<BlockHeader, ConsensusError> {
    #[derive(serde::Serialize)]
    struct HeaderBody {
        index: u64,
        previous_hash: Hash,
        timestamp: u64,
        block_type: BlockType,
        body_digest: Hash,
    }

    let (index, previous_hash) = next_position(tip);
    let block_hash = canonical_hash(&HeaderBody { index, previous_hash, timestamp, block_type, body_digest })
        .map_err(|e| ConsensusError::Assembly(e.to_string()))?;

    Ok(BlockHeader { index, previous_hash, timestamp, block_hash, block_type })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_header_has_index_zero_and_zero_previous_hash() {
        let header = assemble_header(None, 100, BlockType::PoRW, [7u8; 32]).unwrap();
        assert_eq!(header.index, 0);
        assert_eq!(header.previous_hash, [0u8; 32]);
    }

    #[test]
    fn header_extends_given_tip() {
        let tip = BlockHeader { index: 4, previous_hash: [1u8; 32], timestamp: 10, block_hash: [9u8; 32], block_type: BlockType::PoRS };
        let header = assemble_header(Some(&tip), 20, BlockType::PoRW, [3u8; 32]).unwrap();
        assert_eq!(header.index, 5);
        assert_eq!(header.previous_hash, [9u8; 32]);
    }

    #[test]
    fn hash_is_sensitive_to_body_digest() {
        let a = assemble_header(None, 1, BlockType::PoRS, [1u8; 32]).unwrap();
        let b = assemble_header(None, 1, BlockType::PoRS, [2u8; 32]).unwrap();
        assert_ne!(a.block_hash, b.block_hash);
    }
}
