//! # Shared Crypto
//!
//! ## Components
//!
//! | Module      | Algorithm                          | Use case                          |
//! |-------------|-------------------------------------|------------------------------------|
//! | `ecdsa`     | secp256k1                           | Transaction & node identity signing |
//! | `address`   | Base58Check                         | Account addressing                 |
//! | `canonical` | SHA-256 over sorted-key JSON        | Consensus-critical hashing         |
//! | `symmetric` | XChaCha20-Poly1305                  | Memo encryption                    |
//! | `memo`      | ECDH + HKDF-SHA256                  | Memo key derivation                |
//! | `hashing`   | BLAKE3                              | Non-consensus hashing (gossip dedup) |
//!
//! ## Security Properties
//!
//! - **secp256k1**: RFC 6979 deterministic nonces, low-S normalization (EIP-2)
//! - **XChaCha20**: 192-bit nonce, constant-time, side-channel immune
//! - **BLAKE3**: SIMD-accelerated; used only where byte-identical hashing
//!   across nodes is not consensus-critical

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod address;
pub mod canonical;
pub mod ecdsa;
pub mod errors;
pub mod hashing;
pub mod memo;
pub mod symmetric;

pub use ecdsa::{Secp256k1KeyPair, Secp256k1PublicKey};
pub use errors::CryptoError;
pub use hashing::{blake3_hash, Blake3Hasher};
pub use symmetric::{decrypt, encrypt, Cipher, Nonce, SecretKey};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn version_is_not_empty() {
        assert!(!super::VERSION.is_empty());
    }
}
