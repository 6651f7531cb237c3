//! Stealth payment hints.
//!
//! A sender derives a fresh, unlinkable one-time address per payment from
//! the recipient's published scan/spend public keys, so two payments to
//! the same recipient do not share an on-chain address. This reuses the
//! ECDH + HKDF construction `shared_crypto::memo` already uses for
//! encrypted memos, but derives a scalar tweak instead of a symmetric
//! key: the tweak is added to the recipient's spend public key to get the
//! one-time address, and only the holder of the matching spend secret key
//! can add the same tweak to recover the one-time private key.

use hkdf::Hkdf;
use k256::ecdh::diffie_hellman;
use k256::elliptic_curve::PrimeField;
use k256::{PublicKey as K256PublicKey, ProjectivePoint, Scalar, SecretKey as K256SecretKey};
use sha2::Sha256;
use shared_crypto::address;
use shared_types::{Address, PublicKey as WirePublicKey};

use crate::domain::errors::PrivacyError;

const HKDF_INFO: &[u8] = b"quantum-chain/stealth-tweak-v1";

/// A one-time stealth address plus the ephemeral public key the recipient
/// needs, alongside their own scan secret, to recognize and later spend
/// from it.
#[derive(Debug, Clone)]
pub struct StealthHint {
    pub one_time_address: Address,
    pub ephemeral_pubkey: WirePublicKey,
}

fn parse_public(bytes: &[u8; 33]) -> Result<K256PublicKey, PrivacyError> {
    K256PublicKey::from_sec1_bytes(bytes)
        .map_err(|e| PrivacyError::StealthDerivationFailed(e.to_string()))
}

fn derive_tweak_scalar(shared_secret_bytes: &[u8]) -> Result<Scalar, PrivacyError> {
    let hk = Hkdf::<Sha256>::new(None, shared_secret_bytes);
    let mut okm = [0u8; 32];
    hk.expand(HKDF_INFO, &mut okm)
        .expect("32-byte HKDF-SHA256 expand cannot fail");
    let tweak_secret = K256SecretKey::from_bytes((&okm).into())
        .map_err(|_| PrivacyError::StealthDerivationFailed("tweak scalar out of range".into()))?;
    Ok(*tweak_secret.to_nonzero_scalar())
}

fn tweak_point(spend_pubkey: &K256PublicKey, tweak: Scalar) -> Result<[u8; 33], PrivacyError> {
    let tweaked = ProjectivePoint::from(*spend_pubkey.as_affine()) + ProjectivePoint::GENERATOR * tweak;
    let tweaked_pubkey = K256PublicKey::from_affine(tweaked.to_affine())
        .map_err(|e| PrivacyError::StealthDerivationFailed(e.to_string()))?;
    let mut out = [0u8; 33];
    out.copy_from_slice(&tweaked_pubkey.to_sec1_bytes());
    Ok(out)
}

/// Sender side: derive a one-time address for a recipient identified by
/// their scan and spend public keys, using a freshly generated ephemeral
/// keypair.
pub fn derive_stealth_hint(
    address_version: u8,
    recipient_scan_pubkey: &[u8; 33],
    recipient_spend_pubkey: &[u8; 33],
) -> Result<StealthHint, PrivacyError> {
    let scan_pubkey = parse_public(recipient_scan_pubkey)?;
    let spend_pubkey = parse_public(recipient_spend_pubkey)?;

    let ephemeral_secret = K256SecretKey::random(&mut rand::thread_rng());
    let ephemeral_public = ephemeral_secret.public_key();

    let shared = diffie_hellman(&ephemeral_secret.to_nonzero_scalar(), scan_pubkey.as_affine());
    let tweak = derive_tweak_scalar(shared.raw_secret_bytes().as_slice())?;
    let tweaked_bytes = tweak_point(&spend_pubkey, tweak)?;

    let mut ephemeral_bytes = [0u8; 33];
    ephemeral_bytes.copy_from_slice(&ephemeral_public.to_sec1_bytes());

    Ok(StealthHint {
        one_time_address: address::from_public_key(address_version, &tweaked_bytes),
        ephemeral_pubkey: WirePublicKey(ephemeral_bytes),
    })
}

/// Recipient side: recompute the tweak from `scan_secret` and check
/// whether `candidate` is the one-time address this hint produced.
pub fn recognize_stealth_hint(
    scan_secret: &[u8; 32],
    spend_pubkey: &[u8; 33],
    ephemeral_pubkey: &[u8; 33],
    address_version: u8,
    candidate: &Address,
) -> Result<bool, PrivacyError> {
    let scan_secret_key = K256SecretKey::from_bytes(scan_secret.into())
        .map_err(|_| PrivacyError::StealthDerivationFailed("invalid scan secret".into()))?;
    let ephemeral_public = parse_public(ephemeral_pubkey)?;
    let spend_pubkey = parse_public(spend_pubkey)?;

    let shared = diffie_hellman(&scan_secret_key.to_nonzero_scalar(), ephemeral_public.as_affine());
    let tweak = derive_tweak_scalar(shared.raw_secret_bytes().as_slice())?;
    let tweaked_bytes = tweak_point(&spend_pubkey, tweak)?;

    let derived = address::from_public_key(address_version, &tweaked_bytes);
    Ok(&derived == candidate)
}

/// Recipient side: recover the one-time spending secret key for a
/// recognized hint by adding the same tweak to the spend secret key.
pub fn recover_stealth_secret(
    scan_secret: &[u8; 32],
    spend_secret: &[u8; 32],
    ephemeral_pubkey: &[u8; 33],
) -> Result<[u8; 32], PrivacyError> {
    let scan_secret_key = K256SecretKey::from_bytes(scan_secret.into())
        .map_err(|_| PrivacyError::StealthDerivationFailed("invalid scan secret".into()))?;
    let spend_secret_key = K256SecretKey::from_bytes(spend_secret.into())
        .map_err(|_| PrivacyError::StealthDerivationFailed("invalid spend secret".into()))?;
    let ephemeral_public = parse_public(ephemeral_pubkey)?;

    let shared = diffie_hellman(&scan_secret_key.to_nonzero_scalar(), ephemeral_public.as_affine());
    let tweak = derive_tweak_scalar(shared.raw_secret_bytes().as_slice())?;

    let combined: Scalar = *spend_secret_key.to_nonzero_scalar() + tweak;
    let repr = combined.to_repr();
    let mut out = [0u8; 32];
    out.copy_from_slice(&repr);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::address::VERSION_MAINNET;
    use shared_crypto::Secp256k1KeyPair;

    #[test]
    fn recipient_recognizes_their_own_stealth_hint() {
        let scan = Secp256k1KeyPair::generate();
        let spend = Secp256k1KeyPair::generate();

        let hint = derive_stealth_hint(
            VERSION_MAINNET,
            scan.public_key().as_bytes(),
            spend.public_key().as_bytes(),
        )
        .unwrap();

        let recognized = recognize_stealth_hint(
            &scan.to_bytes(),
            spend.public_key().as_bytes(),
            &hint.ephemeral_pubkey.0,
            VERSION_MAINNET,
            &hint.one_time_address,
        )
        .unwrap();
        assert!(recognized);
    }

    #[test]
    fn other_recipients_do_not_recognize_a_foreign_hint() {
        let scan = Secp256k1KeyPair::generate();
        let spend = Secp256k1KeyPair::generate();
        let stranger_scan = Secp256k1KeyPair::generate();

        let hint = derive_stealth_hint(
            VERSION_MAINNET,
            scan.public_key().as_bytes(),
            spend.public_key().as_bytes(),
        )
        .unwrap();

        let recognized = recognize_stealth_hint(
            &stranger_scan.to_bytes(),
            spend.public_key().as_bytes(),
            &hint.ephemeral_pubkey.0,
            VERSION_MAINNET,
            &hint.one_time_address,
        )
        .unwrap();
        assert!(!recognized);
    }

    #[test]
    fn recovered_secret_matches_the_one_time_address() {
        let scan = Secp256k1KeyPair::generate();
        let spend = Secp256k1KeyPair::generate();

        let hint = derive_stealth_hint(
            VERSION_MAINNET,
            scan.public_key().as_bytes(),
            spend.public_key().as_bytes(),
        )
        .unwrap();

        let recovered_secret =
            recover_stealth_secret(&scan.to_bytes(), &spend.to_bytes(), &hint.ephemeral_pubkey.0).unwrap();
        let recovered_keypair = Secp256k1KeyPair::from_bytes(recovered_secret).unwrap();
        let recovered_address = address::from_public_key(VERSION_MAINNET, recovered_keypair.public_key().as_bytes());
        assert_eq!(recovered_address, hint.one_time_address);
    }
}
