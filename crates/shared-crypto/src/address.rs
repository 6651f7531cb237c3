//! # Address encoding (Base58Check)
//!
//! An address's 25-byte payload is `version (1) ‖ hash160 (20) ‖ checksum
//! (4)`, Base58-encoded. The checksum is the first four bytes of
//! `SHA-256(SHA-256(version ‖ hash160))`. `hash160` here is SHA-256 followed
//! by a second SHA-256 truncated to 20 bytes, our hash160-equivalent.

use sha2::{Digest, Sha256};
use shared_types::Address;

use crate::errors::CryptoError;

/// Mainnet address version byte.
pub const VERSION_MAINNET: u8 = 0x00;
/// Testnet address version byte.
pub const VERSION_TESTNET: u8 = 0x6f;

fn sha256d(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    Sha256::digest(first).into()
}

/// The hash160-equivalent used by this chain: SHA-256 then SHA-256,
/// truncated to the first 20 bytes, applied over a compressed public key.
#[must_use]
pub fn hash160(pubkey_bytes: &[u8]) -> [u8; 20] {
    let digest = sha256d(pubkey_bytes);
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest[..20]);
    out
}

/// Encode a 20-byte hash into a Base58Check address under the given version
/// byte.
#[must_use]
pub fn encode(version: u8, hash: &[u8; 20]) -> Address {
    let mut payload = Vec::with_capacity(25);
    payload.push(version);
    payload.extend_from_slice(hash);
    let checksum = sha256d(&payload);
    payload.extend_from_slice(&checksum[..4]);
    Address::new_unchecked(bs58::encode(payload).into_string())
}

/// Derive the address for a compressed secp256k1 public key.
#[must_use]
pub fn from_public_key(version: u8, pubkey_bytes: &[u8; 33]) -> Address {
    encode(version, &hash160(pubkey_bytes))
}

/// Decode and validate a Base58Check address, returning `(version, hash)`.
pub fn decode(address: &str) -> Result<(u8, [u8; 20]), CryptoError> {
    let payload = bs58::decode(address)
        .into_vec()
        .map_err(|e| CryptoError::InvalidAddressEncoding(e.to_string()))?;

    if payload.len() != 25 {
        return Err(CryptoError::InvalidAddressEncoding(format!(
            "expected 25-byte payload, got {}",
            payload.len()
        )));
    }

    let (body, checksum) = payload.split_at(21);
    let expected = sha256d(body);
    if &expected[..4] != checksum {
        return Err(CryptoError::InvalidAddressChecksum);
    }

    let version = body[0];
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&body[1..]);
    Ok((version, hash))
}

/// Validate that a string is a well-formed, checksum-correct address.
#[must_use]
pub fn is_valid(address: &str) -> bool {
    decode(address).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_encode_decode() {
        let hash = [0x42u8; 20];
        let addr = encode(VERSION_MAINNET, &hash);
        let (version, decoded_hash) = decode(addr.as_str()).unwrap();
        assert_eq!(version, VERSION_MAINNET);
        assert_eq!(decoded_hash, hash);
    }

    #[test]
    fn rejects_tampered_checksum() {
        let hash = [0x07u8; 20];
        let addr = encode(VERSION_MAINNET, &hash);
        let mut payload = bs58::decode(addr.as_str()).into_vec().unwrap();
        let last = payload.len() - 1;
        payload[last] ^= 0xFF;
        let tampered = bs58::encode(payload).into_string();
        assert!(decode(&tampered).is_err());
    }

    #[test]
    fn is_valid_reflects_checksum_state() {
        let addr = encode(VERSION_MAINNET, &[0xAAu8; 20]);
        assert!(is_valid(addr.as_str()));
        assert!(!is_valid("not-a-real-address"));
    }

    #[test]
    fn from_public_key_is_deterministic() {
        let pk = [0x03u8; 33];
        assert_eq!(
            from_public_key(VERSION_MAINNET, &pk),
            from_public_key(VERSION_MAINNET, &pk)
        );
    }
}
