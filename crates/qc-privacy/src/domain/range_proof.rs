//! Bit-decomposition range proofs.
//!
//! Proves a Pedersen commitment `C` opens to a value in `[0, 2^BITS)`
//! without revealing the value, by committing to each bit separately and
//! proving each bit commitment opens to 0 or 1 via a Chaum-Pedersen/CDS
//! disjunctive Schnorr proof, then checking the bit commitments
//! aggregate back to `C`.
//!
//! This trades proof size (linear in `BITS`, no aggregation) for needing
//! no trusted setup and no pairing-friendly curve; see the design notes
//! for why this repo does not pull in a bulletproofs dependency.

use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use sha2::{Digest, Sha512};

use crate::domain::commitment::{self, generator_g, generator_h};
use crate::domain::errors::PrivacyError;

/// Width of the confidential amount/fee fields; matches `FixedPoint`'s
/// `u64` base-unit representation.
pub const RANGE_BITS: usize = 64;

/// A single bit's Chaum-Pedersen OR-proof that its commitment opens to
/// either 0 or 1, without revealing which.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitProof {
    #[serde_as(as = "Bytes")]
    t0: [u8; 32],
    #[serde_as(as = "Bytes")]
    t1: [u8; 32],
    #[serde_as(as = "Bytes")]
    e0: [u8; 32],
    #[serde_as(as = "Bytes")]
    s0: [u8; 32],
    #[serde_as(as = "Bytes")]
    s1: [u8; 32],
}

/// A full range proof over `RANGE_BITS` bits.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeProof {
    #[serde_as(as = "Vec<Bytes>")]
    bit_commitments: Vec<[u8; 32]>,
    bit_proofs: Vec<BitProof>,
}

/// The pair of range proofs a confidential transfer carries, serialized
/// into `ConfidentialData::range_proof`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeProofBundle {
    pub amount_proof: RangeProof,
    pub fee_proof: RangeProof,
}

fn scalar_from_wide(bytes: [u8; 64]) -> Scalar {
    Scalar::from_bytes_mod_order_wide(&bytes)
}

fn scalar_from_bytes(bytes: [u8; 32]) -> Scalar {
    Scalar::from_bytes_mod_order(bytes)
}

fn fiat_shamir_challenge(bit_commitment: &[u8; 32], t0: &[u8; 32], t1: &[u8; 32]) -> Scalar {
    let mut hasher = Sha512::new();
    hasher.update(b"quantum-chain/range-proof-bit-v1");
    hasher.update(bit_commitment);
    hasher.update(t0);
    hasher.update(t1);
    let digest: [u8; 64] = hasher.finalize().into();
    scalar_from_wide(digest)
}

/// Proves a single bit commitment `c_i = bit*G + r_i*H` opens to `bit`,
/// which must be 0 or 1.
fn prove_bit(bit: u64, blinding: &Scalar) -> (RistrettoPoint, BitProof) {
    let commitment = commitment::commit(bit, blinding);
    let mut rng = rand::thread_rng();

    // Branch 0 proves knowledge of r such that commitment = r*H.
    // Branch 1 proves knowledge of r such that commitment - G = r*H.
    let p0 = commitment;
    let p1 = commitment - generator_g();

    let (t0, t1, e0, s0, s1);
    if bit == 0 {
        let k = Scalar::random(&mut rng);
        let t0_real = k * generator_h();

        let e1_fake = Scalar::random(&mut rng);
        let s1_fake = Scalar::random(&mut rng);
        let t1_fake = s1_fake * generator_h() - e1_fake * p1;

        let e = fiat_shamir_challenge(&commitment::compress(&commitment), &commitment::compress(&t0_real), &commitment::compress(&t1_fake));
        let e0_real = e - e1_fake;
        let s0_real = k + e0_real * blinding;

        t0 = t0_real;
        t1 = t1_fake;
        e0 = e0_real;
        s0 = s0_real;
        s1 = s1_fake;
    } else {
        let k = Scalar::random(&mut rng);
        let t1_real = k * generator_h();

        let e0_fake = Scalar::random(&mut rng);
        let s0_fake = Scalar::random(&mut rng);
        let t0_fake = s0_fake * generator_h() - e0_fake * p0;

        let e = fiat_shamir_challenge(&commitment::compress(&commitment), &commitment::compress(&t0_fake), &commitment::compress(&t1_real));
        let e1_real = e - e0_fake;
        let s1_real = k + e1_real * blinding;

        t0 = t0_fake;
        t1 = t1_real;
        e0 = e0_fake;
        s0 = s0_fake;
        s1 = s1_real;
    }

    (
        commitment,
        BitProof {
            t0: commitment::compress(&t0),
            t1: commitment::compress(&t1),
            e0: e0.to_bytes(),
            s0: s0.to_bytes(),
            s1: s1.to_bytes(),
        },
    )
}

fn verify_bit(bit_commitment: &RistrettoPoint, proof: &BitProof) -> bool {
    let t0 = match CompressedRistretto(proof.t0).decompress() {
        Some(p) => p,
        None => return false,
    };
    let t1 = match CompressedRistretto(proof.t1).decompress() {
        Some(p) => p,
        None => return false,
    };
    let e0 = scalar_from_bytes(proof.e0);
    let s0 = scalar_from_bytes(proof.s0);
    let s1 = scalar_from_bytes(proof.s1);

    let e = fiat_shamir_challenge(&commitment::compress(bit_commitment), &proof.t0, &proof.t1);
    let e1 = e - e0;

    let p0 = *bit_commitment;
    let p1 = bit_commitment - generator_g();

    let lhs0 = s0 * generator_h();
    let rhs0 = t0 + e0 * p0;
    let lhs1 = s1 * generator_h();
    let rhs1 = t1 + e1 * p1;

    lhs0 == rhs0 && lhs1 == rhs1
}

/// Proves `value` (committed under `total_blinding`) lies in
/// `[0, 2^RANGE_BITS)`. `total_blinding` must be the same blinding factor
/// used to produce the commitment this proof will be checked against.
pub fn prove(value: u64, total_blinding: &Scalar) -> RangeProof {
    let mut bit_commitments = Vec::with_capacity(RANGE_BITS);
    let mut bit_proofs = Vec::with_capacity(RANGE_BITS);
    let mut per_bit_blindings: Vec<Scalar> = Vec::with_capacity(RANGE_BITS);

    for i in 0..RANGE_BITS {
        let bit = (value >> i) & 1;
        let r_i = if i == RANGE_BITS - 1 {
            // Forced so that Σ 2^i * r_i == total_blinding, which is what
            // ties the per-bit commitments back to the caller's existing
            // amount commitment at verification time.
            let partial: Scalar = per_bit_blindings
                .iter()
                .enumerate()
                .fold(Scalar::ZERO, |acc, (shift, r)| acc + scalar_pow2(shift) * r);
            (total_blinding - partial) * scalar_pow2(i).invert()
        } else {
            Scalar::random(&mut rand::thread_rng())
        };
        per_bit_blindings.push(r_i);
        let (c_i, proof_i) = prove_bit(bit, &r_i);
        bit_commitments.push(commitment::compress(&c_i));
        bit_proofs.push(proof_i);
    }

    RangeProof { bit_commitments, bit_proofs }
}

fn scalar_pow2(shift: usize) -> Scalar {
    let mut s = Scalar::ONE;
    for _ in 0..shift {
        s = s + s;
    }
    s
}

/// Verifies `proof` bounds `commitment` to `[0, 2^RANGE_BITS)`.
pub fn verify(commitment_bytes: &[u8], proof: &RangeProof) -> Result<(), PrivacyError> {
    if proof.bit_commitments.len() != RANGE_BITS || proof.bit_proofs.len() != RANGE_BITS {
        return Err(PrivacyError::BitCountMismatch {
            expected: RANGE_BITS,
            actual: proof.bit_commitments.len().max(proof.bit_proofs.len()),
        });
    }

    let committed = commitment::decompress(commitment_bytes)?;

    let mut aggregate = RistrettoPoint::default();
    for (i, (bit_bytes, bit_proof)) in proof.bit_commitments.iter().zip(proof.bit_proofs.iter()).enumerate() {
        let bit_commitment = CompressedRistretto(*bit_bytes)
            .decompress()
            .ok_or(PrivacyError::InvalidPointEncoding)?;
        if !verify_bit(&bit_commitment, bit_proof) {
            return Err(PrivacyError::BitProofInvalid(i));
        }
        aggregate += scalar_pow2(i) * bit_commitment;
    }

    if commitment::compress(&aggregate) != commitment::compress(&committed) {
        return Err(PrivacyError::AggregationMismatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::commitment::random_blinding;

    #[test]
    fn honest_proof_verifies() {
        let value = 123_456_789u64;
        let blinding = random_blinding();
        let commitment = commitment::commit(value, &blinding);
        let proof = prove(value, &blinding);
        assert!(verify(&commitment::compress(&commitment), &proof).is_ok());
    }

    #[test]
    fn zero_value_verifies() {
        let blinding = random_blinding();
        let commitment = commitment::commit(0, &blinding);
        let proof = prove(0, &blinding);
        assert!(verify(&commitment::compress(&commitment), &proof).is_ok());
    }

    #[test]
    fn max_value_verifies() {
        let blinding = random_blinding();
        let commitment = commitment::commit(u64::MAX, &blinding);
        let proof = prove(u64::MAX, &blinding);
        assert!(verify(&commitment::compress(&commitment), &proof).is_ok());
    }

    #[test]
    fn proof_does_not_verify_against_a_different_commitment() {
        let blinding = random_blinding();
        let proof = prove(100, &blinding);
        let other_commitment = commitment::commit(200, &random_blinding());
        assert!(verify(&commitment::compress(&other_commitment), &proof).is_err());
    }

    #[test]
    fn tampered_bit_proof_is_rejected() {
        let value = 7u64;
        let blinding = random_blinding();
        let commitment = commitment::commit(value, &blinding);
        let mut proof = prove(value, &blinding);
        proof.bit_proofs[0].s0 = Scalar::random(&mut rand::thread_rng()).to_bytes();
        assert!(verify(&commitment::compress(&commitment), &proof).is_err());
    }

    #[test]
    fn wrong_bit_count_is_rejected() {
        let value = 7u64;
        let blinding = random_blinding();
        let commitment = commitment::commit(value, &blinding);
        let mut proof = prove(value, &blinding);
        proof.bit_commitments.pop();
        proof.bit_proofs.pop();
        assert!(verify(&commitment::compress(&commitment), &proof).is_err());
    }
}
