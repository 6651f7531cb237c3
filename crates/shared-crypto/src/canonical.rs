//! # Canonical hashing
//!
//! Consensus-critical identity (`block_hash`, transaction `id`) is SHA-256
//! over the canonical JSON encoding of a value: object keys sorted
//! lexicographically, floats at fixed precision, no insignificant
//! whitespace. This is deliberately SHA-256, not the faster BLAKE3 used
//! elsewhere in this crate for non-consensus purposes (gossip dedup keys) —
//! every validating node must agree byte-for-byte on what gets hashed, and
//! SHA-256 is what spec mandates for that role.
//!
//! `serde_json::Value`'s `Map` is backed by a `BTreeMap` when the
//! `preserve_order` feature is off, which gives us sorted keys for free;
//! this crate does not enable that feature.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::errors::CryptoError;

/// Recursively canonicalize a `Value`: object keys end up sorted because we
/// rebuild every map through a `BTreeMap`-backed `serde_json::Map`, and
/// floats are rendered through `serde_json::Number` which already avoids
/// trailing-zero / exponent ambiguity for the finite values this chain
/// deals in.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        Value::Object(map) => {
            let mut sorted = serde_json::Map::new();
            let mut keys: Vec<String> = map.keys().cloned().collect();
            keys.sort();
            for key in keys {
                if let Some(v) = map.get(&key) {
                    sorted.insert(key, canonicalize(v.clone()));
                }
            }
            Value::Object(sorted)
        }
        other => other,
    }
}

/// Serialize `value` to its canonical JSON byte representation.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, CryptoError> {
    let raw = serde_json::to_value(value)
        .map_err(|e| CryptoError::InvalidInput(format!("serialize: {e}")))?;
    let canonical = canonicalize(raw);
    serde_json::to_vec(&canonical).map_err(|e| CryptoError::InvalidInput(format!("encode: {e}")))
}

/// SHA-256 over the canonical JSON encoding of `value`.
pub fn canonical_hash<T: Serialize>(value: &T) -> Result<[u8; 32], CryptoError> {
    let bytes = to_canonical_bytes(value)?;
    Ok(Sha256::digest(bytes).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use serde_json::json;

    #[derive(Serialize)]
    struct Unordered {
        zeta: u32,
        alpha: u32,
    }

    #[test]
    fn key_order_does_not_affect_hash() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(
            to_canonical_bytes(&a).unwrap(),
            to_canonical_bytes(&b).unwrap()
        );
    }

    #[test]
    fn struct_field_order_does_not_affect_hash() {
        let value = Unordered { zeta: 1, alpha: 2 };
        let bytes = to_canonical_bytes(&value).unwrap();
        let expected = to_canonical_bytes(&json!({"alpha": 2, "zeta": 1})).unwrap();
        assert_eq!(bytes, expected);
    }

    #[test]
    fn hash_is_deterministic() {
        let value = json!({"index": 1, "previous_hash": "abc"});
        assert_eq!(canonical_hash(&value).unwrap(), canonical_hash(&value).unwrap());
    }

    #[test]
    fn nested_objects_are_sorted_recursively() {
        let a = json!({"outer": {"z": 1, "a": 2}});
        let b = json!({"outer": {"a": 2, "z": 1}});
        assert_eq!(canonical_hash(&a).unwrap(), canonical_hash(&b).unwrap());
    }
}
