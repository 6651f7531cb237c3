//! Outbound port: the authoritative local store of chunk bytes the engine
//! verifies challenge responses against (spec.md §4.8: "Verifier
//! recomputes the expected proof from its own authoritative copy").

use shared_types::Hash;

pub trait ChunkSource: Send + Sync {
    /// Raw bytes for a chunk this node holds locally, if any.
    fn chunk_bytes(&self, chunk_id: &Hash) -> Option<Vec<u8>>;
}
