//! Chunking (spec.md §4.8): payloads are split into fixed-size chunks
//! (default 1 MiB), each identified by the content hash of its bytes.

use sha2::{Digest, Sha256};
use shared_types::Hash;

/// A single storage chunk: its content and the identifier derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// `SHA-256` over `data`.
    pub id: Hash,
    pub data: Vec<u8>,
}

/// Content-addressed chunk identifier. This is consensus-critical (the
/// identifier provers and verifiers both reference), so it uses SHA-256
/// rather than the BLAKE3 hasher reserved for non-consensus gossip dedup.
#[must_use]
pub fn chunk_id(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Split `payload` into consecutive `chunk_size`-byte pieces; the final
/// piece may be shorter. An empty payload yields no chunks.
#[must_use]
pub fn split_into_chunks(payload: &[u8], chunk_size: usize) -> Vec<Chunk> {
    if chunk_size == 0 || payload.is_empty() {
        return Vec::new();
    }
    payload
        .chunks(chunk_size)
        .map(|data| Chunk { id: chunk_id(data), data: data.to_vec() })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_into_expected_piece_count() {
        let payload = vec![7u8; 2500];
        let chunks = split_into_chunks(&payload, 1000);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].data.len(), 1000);
        assert_eq!(chunks[2].data.len(), 500);
    }

    #[test]
    fn chunk_id_is_deterministic_and_content_sensitive() {
        let a = chunk_id(b"hello");
        let b = chunk_id(b"hello");
        let c = chunk_id(b"world");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn empty_payload_yields_no_chunks() {
        assert!(split_into_chunks(&[], 1024).is_empty());
    }
}
