//! A blind Schnorr signature scheme, used by the mixing coordinator to
//! issue an unlinkable output token: the coordinator signs a blinded
//! commitment it cannot read, so it can later verify the resulting
//! signature on an output address without being able to connect that
//! address back to the input that funded it.
//!
//! This is the classic three-move blind Schnorr construction (signer
//! commits to a nonce, the requester blinds the challenge, the signer
//! signs the blinded challenge, the requester unblinds the signature).
//! No blind-signature crate exists in this corpus, so this is built
//! directly on the `k256` group already used for node identity and
//! transaction signing — kept as a single mixing session's worth of
//! nonces rather than reused across many concurrent sessions, since
//! blind Schnorr is known to be forgeable under many concurrently open
//! signing sessions (the ROS attack).

use k256::elliptic_curve::PrimeField;
use k256::{PublicKey as K256PublicKey, ProjectivePoint, Scalar, SecretKey as K256SecretKey};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use sha2::{Digest, Sha256};

use crate::domain::errors::PrivacyError;

const CHALLENGE_DOMAIN: &[u8] = b"quantum-chain/blind-schnorr-v1";

fn point_to_bytes(point: ProjectivePoint) -> Result<[u8; 33], PrivacyError> {
    let pubkey = K256PublicKey::from_affine(point.to_affine())
        .map_err(|e| PrivacyError::BlindSignature(e.to_string()))?;
    let mut out = [0u8; 33];
    out.copy_from_slice(&pubkey.to_sec1_bytes());
    Ok(out)
}

fn point_from_bytes(bytes: &[u8; 33]) -> Result<ProjectivePoint, PrivacyError> {
    let pubkey = K256PublicKey::from_sec1_bytes(bytes)
        .map_err(|e| PrivacyError::BlindSignature(e.to_string()))?;
    Ok(ProjectivePoint::from(*pubkey.as_affine()))
}

fn scalar_to_bytes(scalar: Scalar) -> [u8; 32] {
    let repr = scalar.to_repr();
    let mut out = [0u8; 32];
    out.copy_from_slice(&repr);
    out
}

fn scalar_from_bytes(bytes: [u8; 32]) -> Result<Scalar, PrivacyError> {
    let secret = K256SecretKey::from_bytes((&bytes).into())
        .map_err(|_| PrivacyError::BlindSignature("scalar out of range".into()))?;
    Ok(*secret.to_nonzero_scalar())
}

fn random_scalar() -> Scalar {
    *K256SecretKey::random(&mut rand::thread_rng()).to_nonzero_scalar()
}

fn hash_challenge(r_bytes: &[u8; 33], message: &[u8]) -> Result<Scalar, PrivacyError> {
    let mut hasher = Sha256::new();
    hasher.update(CHALLENGE_DOMAIN);
    hasher.update(r_bytes);
    hasher.update(message);
    let digest: [u8; 32] = hasher.finalize().into();
    scalar_from_bytes(digest)
}

/// The coordinator's long-term blind-signing keypair.
pub struct SignerKeyPair {
    secret: Scalar,
    public_bytes: [u8; 33],
}

impl SignerKeyPair {
    pub fn generate() -> Result<Self, PrivacyError> {
        let secret = random_scalar();
        let public_bytes = point_to_bytes(ProjectivePoint::GENERATOR * secret)?;
        Ok(Self { secret, public_bytes })
    }

    #[must_use]
    pub fn public_key_bytes(&self) -> [u8; 33] {
        self.public_bytes
    }
}

/// A signer-side per-session nonce. Consumed by [`sign_blinded`] so it
/// can never be reused across two requests.
pub struct SignerNonce {
    k: Scalar,
    r_bytes: [u8; 33],
}

/// Step 1 (signer): commit to a fresh nonce and publish its point.
pub fn signer_commit() -> Result<SignerNonce, PrivacyError> {
    let k = random_scalar();
    let r_bytes = point_to_bytes(ProjectivePoint::GENERATOR * k)?;
    Ok(SignerNonce { k, r_bytes })
}

#[must_use]
pub fn nonce_commitment(nonce: &SignerNonce) -> [u8; 33] {
    nonce.r_bytes
}

/// Requester-side blinding state kept between [`blind_message`] and
/// [`unblind`].
pub struct BlindingState {
    alpha: Scalar,
    r_prime_bytes: [u8; 33],
}

/// Step 2 (requester): blind `message` against the signer's published
/// nonce commitment and public key, returning the state to unblind with
/// later plus the blinded challenge to send back to the signer.
pub fn blind_message(
    message: &[u8],
    signer_public_key: &[u8; 33],
    signer_commitment: &[u8; 33],
) -> Result<(BlindingState, [u8; 32]), PrivacyError> {
    let r = point_from_bytes(signer_commitment)?;
    let q = point_from_bytes(signer_public_key)?;
    let alpha = random_scalar();
    let beta = random_scalar();

    let r_prime = r + ProjectivePoint::GENERATOR * alpha + q * beta;
    let r_prime_bytes = point_to_bytes(r_prime)?;
    let e_prime = hash_challenge(&r_prime_bytes, message)?;
    let e = e_prime + beta;

    Ok((BlindingState { alpha, r_prime_bytes }, scalar_to_bytes(e)))
}

/// Step 3 (signer): sign the blinded challenge with the per-session
/// nonce. Consumes the nonce so it cannot be reused for a second request.
pub fn sign_blinded(
    nonce: SignerNonce,
    signer: &SignerKeyPair,
    blinded_challenge: &[u8; 32],
) -> Result<[u8; 32], PrivacyError> {
    let e = scalar_from_bytes(*blinded_challenge)?;
    let s = nonce.k + e * signer.secret;
    Ok(scalar_to_bytes(s))
}

/// A finished, verifiable blind Schnorr signature.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlindSignature {
    #[serde_as(as = "Bytes")]
    pub r_prime: [u8; 33],
    #[serde_as(as = "Bytes")]
    pub s_prime: [u8; 32],
}

/// Step 4 (requester): remove the blinding factor from the signer's
/// response, producing a signature the signer never saw in this form.
pub fn unblind(state: &BlindingState, blinded_signature: &[u8; 32]) -> Result<BlindSignature, PrivacyError> {
    let s = scalar_from_bytes(*blinded_signature)?;
    let s_prime = s + state.alpha;
    Ok(BlindSignature { r_prime: state.r_prime_bytes, s_prime: scalar_to_bytes(s_prime) })
}

/// Verify a blind Schnorr signature against the signer's long-term
/// public key. Does not require (or reveal) any blinding state.
pub fn verify(message: &[u8], signer_public_key: &[u8; 33], signature: &BlindSignature) -> Result<bool, PrivacyError> {
    let q = point_from_bytes(signer_public_key)?;
    let r_prime = point_from_bytes(&signature.r_prime)?;
    let s_prime = scalar_from_bytes(signature.s_prime)?;
    let e_prime = hash_challenge(&signature.r_prime, message)?;

    let lhs = ProjectivePoint::GENERATOR * s_prime;
    let rhs = r_prime + q * e_prime;
    Ok(lhs == rhs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn honest_blind_signature_verifies() {
        let signer = SignerKeyPair::generate().unwrap();
        let nonce = signer_commit().unwrap();
        let commitment = nonce_commitment(&nonce);
        let message = b"mixing-session output address";

        let (state, blinded_challenge) = blind_message(message, &signer.public_key_bytes(), &commitment).unwrap();
        let blinded_signature = sign_blinded(nonce, &signer, &blinded_challenge).unwrap();
        let signature = unblind(&state, &blinded_signature).unwrap();

        assert!(verify(message, &signer.public_key_bytes(), &signature).unwrap());
    }

    #[test]
    fn signature_does_not_verify_for_a_different_message() {
        let signer = SignerKeyPair::generate().unwrap();
        let nonce = signer_commit().unwrap();
        let commitment = nonce_commitment(&nonce);
        let message = b"output address A";

        let (state, blinded_challenge) = blind_message(message, &signer.public_key_bytes(), &commitment).unwrap();
        let blinded_signature = sign_blinded(nonce, &signer, &blinded_challenge).unwrap();
        let signature = unblind(&state, &blinded_signature).unwrap();

        assert!(!verify(b"output address B", &signer.public_key_bytes(), &signature).unwrap());
    }

    #[test]
    fn signature_does_not_verify_under_a_different_signer_key() {
        let signer = SignerKeyPair::generate().unwrap();
        let impostor = SignerKeyPair::generate().unwrap();
        let nonce = signer_commit().unwrap();
        let commitment = nonce_commitment(&nonce);
        let message = b"output address";

        let (state, blinded_challenge) = blind_message(message, &signer.public_key_bytes(), &commitment).unwrap();
        let blinded_signature = sign_blinded(nonce, &signer, &blinded_challenge).unwrap();
        let signature = unblind(&state, &blinded_signature).unwrap();

        assert!(!verify(message, &impostor.public_key_bytes(), &signature).unwrap());
    }
}
