//! # Encrypted memo envelopes
//!
//! ECDH between sender and recipient public keys derives a shared secret;
//! HKDF-SHA256 stretches it into an XChaCha20-Poly1305 key; the ciphertext,
//! ephemeral public key, and nonce are packaged into
//! `shared_types::EncryptedMemo`. Decryption repeats the same ECDH + HKDF
//! derivation from the recipient's side and is otherwise symmetric.

use hkdf::Hkdf;
use k256::ecdh::diffie_hellman;
use k256::{PublicKey as K256PublicKey, SecretKey as K256SecretKey};
use sha2::Sha256;
use shared_types::{EncryptedMemo, PublicKey as WirePublicKey};

use crate::errors::CryptoError;
use crate::symmetric::{self, Nonce, SecretKey};

const HKDF_INFO: &[u8] = b"quantum-chain/memo-v1";

fn parse_public(bytes: &[u8; 33]) -> Result<K256PublicKey, CryptoError> {
    K256PublicKey::from_sec1_bytes(bytes).map_err(|_| CryptoError::InvalidPublicKey)
}

fn derive_memo_key(shared_secret_bytes: &[u8]) -> SecretKey {
    let hk = Hkdf::<Sha256>::new(None, shared_secret_bytes);
    let mut okm = [0u8; 32];
    // HKDF output length is fixed at 32 bytes; this only fails for
    // requested lengths HKDF-SHA256 cannot produce, which 32 is not.
    hk.expand(HKDF_INFO, &mut okm)
        .expect("32-byte HKDF-SHA256 expand cannot fail");
    SecretKey::from_bytes(okm)
}

/// Encrypt `plaintext` for `recipient_pubkey` using a freshly generated
/// ephemeral keypair. The sender's long-term key never appears in the
/// envelope; only the ephemeral public key does, so observers cannot link
/// memos to the sender's identity via this field alone.
pub fn encrypt_memo(
    recipient_pubkey: &[u8; 33],
    plaintext: &[u8],
) -> Result<EncryptedMemo, CryptoError> {
    let recipient = parse_public(recipient_pubkey)?;
    let ephemeral_secret = K256SecretKey::random(&mut rand::thread_rng());
    let ephemeral_public = ephemeral_secret.public_key();

    let shared = diffie_hellman(&ephemeral_secret.to_nonzero_scalar(), recipient.as_affine());
    let memo_key = derive_memo_key(shared.raw_secret_bytes().as_slice());

    let (ciphertext, nonce) = symmetric::encrypt(&memo_key, plaintext)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut ephemeral_bytes = [0u8; 33];
    ephemeral_bytes.copy_from_slice(&ephemeral_public.to_sec1_bytes());

    Ok(EncryptedMemo {
        ephemeral_pubkey: WirePublicKey(ephemeral_bytes),
        nonce: *nonce.as_bytes(),
        ciphertext,
        signature: None,
    })
}

/// Decrypt an `EncryptedMemo` using the recipient's long-term secret key.
pub fn decrypt_memo(
    recipient_secret: &[u8; 32],
    memo: &EncryptedMemo,
) -> Result<Vec<u8>, CryptoError> {
    let secret = K256SecretKey::from_bytes(recipient_secret.into())
        .map_err(|_| CryptoError::InvalidPrivateKey)?;
    let ephemeral_public = parse_public(&memo.ephemeral_pubkey.0)?;

    let shared = diffie_hellman(&secret.to_nonzero_scalar(), ephemeral_public.as_affine());
    let memo_key = derive_memo_key(shared.raw_secret_bytes().as_slice());

    let nonce = Nonce::from_bytes(memo.nonce);
    symmetric::decrypt(&memo_key, &memo.ciphertext, &nonce)
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
}
