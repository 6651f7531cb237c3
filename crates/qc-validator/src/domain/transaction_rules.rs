//! Transaction validation: spec.md §4.6's transaction rules.
//!
//! A transaction's `signature` field carries `pubkey (33 bytes) ‖ DER
//! signature`, the scriptSig-style convention that lets the validator
//! re-derive the claimed sender's address from the same bytes it verifies
//! the signature against, without widening `Transaction` itself with a
//! public-key field that would otherwise never participate in consensus
//! hashing.

use shared_crypto::{address, Secp256k1PublicKey};
use shared_types::{ConsensusParams, FixedPoint, Transaction};

use super::errors::ValidatorError;

const PUBKEY_LEN: usize = 33;

fn split_signature(bytes: &[u8]) -> Result<(Secp256k1PublicKey, &[u8]), ValidatorError> {
    if bytes.len() <= PUBKEY_LEN {
        return Err(ValidatorError::MalformedEntity(
            "signature too short to carry a public key".into(),
        ));
    }
    let (pubkey_bytes, der) = bytes.split_at(PUBKEY_LEN);
    let mut fixed = [0u8; PUBKEY_LEN];
    fixed.copy_from_slice(pubkey_bytes);
    let pubkey = Secp256k1PublicKey::from_bytes(fixed)
        .map_err(|_| ValidatorError::MalformedEntity("invalid public key encoding".into()))?;
    Ok((pubkey, der))
}

/// Recompute `shared_crypto::canonical::canonical_hash` over the body
/// fields that participate in a transaction's id: everything except `id`,
/// `signature`, and `status`.
pub fn canonical_body_hash(tx: &Transaction) -> Result<[u8; 32], ValidatorError> {
    #[derive(serde::Serialize)]
    struct Body<'a> {
        sender: &'a str,
        recipient: &'a str,
        amount: Option<FixedPoint>,
        fee: FixedPoint,
        timestamp: u64,
        memo: &'a Option<shared_types::Memo>,
        confidential_data: &'a Option<shared_types::ConfidentialData>,
    }

    let body = Body {
        sender: tx.sender.as_str(),
        recipient: tx.recipient.as_str(),
        amount: tx.amount,
        fee: tx.fee,
        timestamp: tx.timestamp,
        memo: &tx.memo,
        confidential_data: &tx.confidential_data,
    };

    shared_crypto::canonical::canonical_hash(&body)
        .map_err(|e| ValidatorError::MalformedEntity(format!("cannot canonicalize body: {e}")))
}

/// Structural + cryptographic checks that do not require chain/state
/// context: id integrity, address checksum, signature, fee floor, and the
/// plain-vs-confidential amount shape. Balance sufficiency is checked
/// separately by the caller, which holds the outbound state port.
pub fn check_transaction_shape(
    tx: &Transaction,
    params: &ConsensusParams,
) -> Result<(), ValidatorError> {
    let expected_id = canonical_body_hash(tx)?;
    if tx.id != expected_id {
        return Err(ValidatorError::MalformedEntity(
            "transaction id does not match canonical hash of body".into(),
        ));
    }

    if tx.fee < params.min_fee {
        return Err(ValidatorError::MalformedEntity(format!(
            "fee {} below minimum {}",
            tx.fee, params.min_fee
        )));
    }

    match (tx.amount, &tx.confidential_data) {
        (Some(_), None) | (None, Some(_)) => {}
        (Some(_), Some(_)) => {
            return Err(ValidatorError::MalformedEntity(
                "transaction carries both a plain amount and confidential data".into(),
            ));
        }
        (None, None) => {
            return Err(ValidatorError::MalformedEntity(
                "transaction carries neither a plain amount nor confidential data".into(),
            ));
        }
    }

    if tx.is_coinbase() {
        return Ok(());
    }

    if !address::is_valid(tx.sender.as_str()) {
        return Err(ValidatorError::MalformedEntity("bad sender address checksum".into()));
    }
    if !address::is_valid(tx.recipient.as_str()) {
        return Err(ValidatorError::MalformedEntity("bad recipient address checksum".into()));
    }

    let Some(signature) = &tx.signature else {
        return Err(ValidatorError::InvalidSignature);
    };
    let (pubkey, der_signature) = split_signature(signature)?;

    let derived = address::from_public_key(address::VERSION_MAINNET, pubkey.as_bytes());
    if derived != tx.sender {
        return Err(ValidatorError::InvalidSignature);
    }

    pubkey
        .verify(&expected_id, der_signature)
        .map_err(|_| ValidatorError::InvalidSignature)?;

    Ok(())
}

/// Balance sufficiency against a previously looked-up sender balance.
/// Confidential transfers hide the amount in a commitment and are not
/// checked here; spec.md §4.11 defers their accounting to a separate
/// scheme the base ledger does not strengthen.
pub fn check_sufficient_balance(tx: &Transaction, sender_balance: FixedPoint) -> Result<(), ValidatorError> {
    let Some(amount) = tx.amount else {
        return Ok(());
    };
    let required = amount.checked_add(tx.fee).ok_or_else(|| {
        ValidatorError::MalformedEntity("amount + fee overflows FixedPoint".into())
    })?;
    if sender_balance < required {
        return Err(ValidatorError::InsufficientFunds {
            available: sender_balance.to_string(),
            required: required.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::Secp256k1KeyPair;
    use shared_types::TransactionStatus;

    fn signed_tx(fee: u64, amount: u64) -> Transaction {
        let keypair = Secp256k1KeyPair::from_bytes([7u8; 32]).unwrap();
        let sender = address::from_public_key(address::VERSION_MAINNET, keypair.public_key().as_bytes());
        let other_keypair = Secp256k1KeyPair::from_bytes([9u8; 32]).unwrap();
        let recipient = address::from_public_key(address::VERSION_MAINNET, other_keypair.public_key().as_bytes());

        let mut tx = Transaction {
            id: [0u8; 32],
            sender,
            recipient,
            amount: Some(FixedPoint(amount)),
            fee: FixedPoint(fee),
            timestamp: 1_700_000_000,
            signature: None,
            memo: None,
            confidential_data: None,
            status: TransactionStatus::Pending,
        };
        tx.id = canonical_body_hash(&tx).unwrap();

        let der = keypair.sign(&tx.id);
        let mut sig = keypair.public_key().as_bytes().to_vec();
        sig.extend_from_slice(&der);
        tx.signature = Some(sig);
        tx
    }

    #[test]
    fn well_formed_transaction_passes() {
        let tx = signed_tx(2000, 500);
        let params = ConsensusParams::default();
        assert!(check_transaction_shape(&tx, &params).is_ok());
    }

    #[test]
    fn tampered_amount_invalidates_id() {
        let mut tx = signed_tx(2000, 500);
        tx.amount = Some(FixedPoint(999_999));
        let params = ConsensusParams::default();
        assert!(check_transaction_shape(&tx, &params).is_err());
    }

    #[test]
    fn fee_below_minimum_rejected() {
        let tx = signed_tx(1, 500);
        let params = ConsensusParams::default();
        assert!(matches!(
            check_transaction_shape(&tx, &params),
            Err(ValidatorError::MalformedEntity(_))
        ));
    }

    #[test]
    fn insufficient_balance_rejected() {
        let tx = signed_tx(2000, 500);
        let result = check_sufficient_balance(&tx, FixedPoint(100));
        assert!(matches!(result, Err(ValidatorError::InsufficientFunds { .. })));
    }

    #[test]
    fn sufficient_balance_accepted() {
        let tx = signed_tx(2000, 500);
        assert!(check_sufficient_balance(&tx, FixedPoint(10_000)).is_ok());
    }
}
