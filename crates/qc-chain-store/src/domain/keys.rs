//! Key schema for the underlying key-value store.
//!
//! Everything is namespaced by a short ASCII prefix so a single flat
//! keyspace (one sled tree, or one `BTreeMap`) can serve every secondary
//! index without collisions.

use shared_types::{BlockType, Hash};

pub fn block_by_index(index: u64) -> Vec<u8> {
    let mut key = b"blk:idx:".to_vec();
    key.extend_from_slice(&index.to_be_bytes());
    key
}

pub fn index_by_hash(hash: &Hash) -> Vec<u8> {
    let mut key = b"blk:hash:".to_vec();
    key.extend_from_slice(hash);
    key
}

pub fn latest_by_type(block_type: BlockType) -> Vec<u8> {
    match block_type {
        BlockType::PoRW => b"blk:type:porw".to_vec(),
        BlockType::PoRS => b"blk:type:pors".to_vec(),
    }
}

pub const TIP_KEY: &[u8] = b"blk:tip";

pub fn tx_by_id(id: &Hash) -> Vec<u8> {
    let mut key = b"tx:".to_vec();
    key.extend_from_slice(id);
    key
}

pub fn addr_index_prefix(address: &str) -> Vec<u8> {
    let mut key = b"addr:".to_vec();
    key.extend_from_slice(address.as_bytes());
    key.push(b':');
    key
}

pub fn addr_index(address: &str, tx_id: &Hash) -> Vec<u8> {
    let mut key = addr_index_prefix(address);
    key.extend_from_slice(tx_id);
    key
}
