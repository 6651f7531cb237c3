//! The privacy service: confidential transfers, stealth payment hints,
//! and the mixing coordinator, composed behind the ports in
//! `crate::ports::inbound`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use quantum_telemetry::SUBSYSTEM_ERRORS;
use shared_types::{Address, ConfidentialData, FixedPoint};
use tracing::instrument;

use crate::domain::blind_sign::{self, SignerKeyPair, SignerNonce};
use crate::domain::commitment;
use crate::domain::errors::PrivacyError;
use crate::domain::mixing::{MixingEvent, MixingPhase, MixingSession, PhaseTimeouts};
use crate::domain::range_proof::{self, RangeProofBundle};
use crate::domain::stealth::{self, StealthHint};
use crate::ports::inbound::{ConfidentialTransferBuilder, MixingCoordinator, SessionId, StealthAddressing};

struct SessionState {
    session: MixingSession,
    registered_commitments: Vec<Vec<u8>>,
    pending_nonces: HashMap<[u8; 33], SignerNonce>,
    issued_signatures: usize,
    phase_entered_at: u64,
}

fn apply_event(state: &mut SessionState, event: MixingEvent, now: u64) -> Result<MixingPhase, PrivacyError> {
    let before = state.session.phase;
    let after = state.session.apply(event)?;
    if after != before {
        state.phase_entered_at = now;
    }
    Ok(after)
}

/// Composes confidential transfers, stealth addressing, and the mixing
/// coordinator behind a single handle, per spec.md §4.11.
pub struct PrivacyService {
    address_version: u8,
    signer: SignerKeyPair,
    timeouts: PhaseTimeouts,
    sessions: Mutex<HashMap<SessionId, SessionState>>,
    next_session_id: AtomicU64,
}

impl PrivacyService {
    pub fn new(address_version: u8) -> Result<Self, PrivacyError> {
        Ok(Self {
            address_version,
            signer: SignerKeyPair::generate()?,
            timeouts: PhaseTimeouts::default(),
            sessions: Mutex::new(HashMap::new()),
            next_session_id: AtomicU64::new(1),
        })
    }

    /// The coordinator's long-term blind-signing public key, published so
    /// participants can verify the output tokens it issues.
    #[must_use]
    pub fn mixing_signer_public_key(&self) -> [u8; 33] {
        self.signer.public_key_bytes()
    }

    fn verify_transfer_impl(&self, data: &ConfidentialData) -> Result<(), PrivacyError> {
        let bundle: RangeProofBundle =
            bincode::deserialize(&data.range_proof).map_err(|e| PrivacyError::MalformedProof(e.to_string()))?;
        range_proof::verify(&data.amount_commitment, &bundle.amount_proof)?;
        range_proof::verify(&data.fee_commitment, &bundle.fee_proof)?;
        Ok(())
    }

    fn check_timeout(&self, state: &mut SessionState, now: u64) {
        if let Some(deadline) = self.timeouts.for_phase(state.session.phase) {
            if now.saturating_sub(state.phase_entered_at) > deadline.as_secs() {
                let _ = apply_event(state, MixingEvent::Timeout, now);
            }
        }
    }
}

impl ConfidentialTransferBuilder for PrivacyService {
    #[instrument(skip(self, amount, fee))]
    fn build_transfer(&self, amount: FixedPoint, fee: FixedPoint) -> Result<ConfidentialData, PrivacyError> {
        let amount_blinding = commitment::random_blinding();
        let fee_blinding = commitment::random_blinding();

        let amount_commitment = commitment::commit(amount.0, &amount_blinding);
        let fee_commitment = commitment::commit(fee.0, &fee_blinding);

        let bundle = RangeProofBundle {
            amount_proof: range_proof::prove(amount.0, &amount_blinding),
            fee_proof: range_proof::prove(fee.0, &fee_blinding),
        };
        let range_proof_bytes = bincode::serialize(&bundle).map_err(|e| PrivacyError::MalformedProof(e.to_string()))?;

        Ok(ConfidentialData {
            amount_commitment: commitment::compress(&amount_commitment).to_vec(),
            fee_commitment: commitment::compress(&fee_commitment).to_vec(),
            range_proof: range_proof_bytes,
        })
    }

    #[instrument(skip(self, data))]
    fn verify_transfer(&self, data: &ConfidentialData) -> bool {
        let ok = self.verify_transfer_impl(data).is_ok();
        if !ok {
            SUBSYSTEM_ERRORS.with_label_values(&["qc-privacy", "invalid_range_proof"]).inc();
        }
        ok
    }
}

/// Implements `qc-validator`'s outbound confidential-proof port directly,
/// so a wired node can hand `Arc<PrivacyService>` straight to the
/// validator without an adapter shim.
impl qc_validator::ports::outbound::ConfidentialProofVerifier for PrivacyService {
    fn verify(&self, data: &ConfidentialData) -> bool {
        ConfidentialTransferBuilder::verify_transfer(self, data)
    }
}

impl StealthAddressing for PrivacyService {
    fn derive_hint(&self, recipient_scan_pubkey: &[u8; 33], recipient_spend_pubkey: &[u8; 33]) -> Result<StealthHint, PrivacyError> {
        stealth::derive_stealth_hint(self.address_version, recipient_scan_pubkey, recipient_spend_pubkey)
    }

    fn recognize_hint(
        &self,
        scan_secret: &[u8; 32],
        spend_pubkey: &[u8; 33],
        ephemeral_pubkey: &[u8; 33],
        candidate: &Address,
    ) -> Result<bool, PrivacyError> {
        stealth::recognize_stealth_hint(scan_secret, spend_pubkey, ephemeral_pubkey, self.address_version, candidate)
    }
}

impl MixingCoordinator for PrivacyService {
    fn create_session(&self, denomination: FixedPoint, min_participants: usize, now: u64) -> SessionId {
        let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        let mut sessions = self.sessions.lock().expect("mixing session mutex poisoned");
        sessions.insert(
            id,
            SessionState {
                session: MixingSession::new(denomination, min_participants),
                registered_commitments: Vec::new(),
                pending_nonces: HashMap::new(),
                issued_signatures: 0,
                phase_entered_at: now,
            },
        );
        id
    }

    fn register_participant(&self, session: SessionId, input_commitment: Vec<u8>, now: u64) -> Result<MixingPhase, PrivacyError> {
        let mut sessions = self.sessions.lock().expect("mixing session mutex poisoned");
        let state = sessions.get_mut(&session).ok_or(PrivacyError::UnknownSession)?;
        self.check_timeout(state, now);
        state.registered_commitments.push(input_commitment);
        let total = state.registered_commitments.len();
        apply_event(state, MixingEvent::ParticipantRegistered { total_registered: total }, now)
    }

    #[instrument(skip(self))]
    fn verify_commitments(&self, session: SessionId, now: u64) -> Result<MixingPhase, PrivacyError> {
        let mut sessions = self.sessions.lock().expect("mixing session mutex poisoned");
        let state = sessions.get_mut(&session).ok_or(PrivacyError::UnknownSession)?;
        self.check_timeout(state, now);

        for input_commitment in &state.registered_commitments {
            commitment::decompress(input_commitment).map_err(|_| PrivacyError::Mixing("malformed input commitment".into()))?;
        }

        let phase = apply_event(state, MixingEvent::AllCommitmentsVerified, now)?;
        for _ in 0..state.registered_commitments.len() {
            let nonce = blind_sign::signer_commit()?;
            let r_bytes = blind_sign::nonce_commitment(&nonce);
            state.pending_nonces.insert(r_bytes, nonce);
        }
        Ok(phase)
    }

    fn request_signing_nonce(&self, session: SessionId) -> Result<[u8; 33], PrivacyError> {
        let sessions = self.sessions.lock().expect("mixing session mutex poisoned");
        let state = sessions.get(&session).ok_or(PrivacyError::UnknownSession)?;
        if state.session.phase != MixingPhase::Signing {
            return Err(PrivacyError::Mixing("session is not in the signing phase".into()));
        }
        state
            .pending_nonces
            .keys()
            .next()
            .copied()
            .ok_or_else(|| PrivacyError::Mixing("no signing nonces left to claim".into()))
    }

    #[instrument(skip(self, blinded_challenge))]
    fn issue_output_signature(
        &self,
        session: SessionId,
        nonce_commitment: &[u8; 33],
        blinded_challenge: &[u8; 32],
        now: u64,
    ) -> Result<[u8; 32], PrivacyError> {
        let mut sessions = self.sessions.lock().expect("mixing session mutex poisoned");
        let state = sessions.get_mut(&session).ok_or(PrivacyError::UnknownSession)?;
        if state.session.phase != MixingPhase::Signing {
            return Err(PrivacyError::Mixing("session is not in the signing phase".into()));
        }
        let nonce = state
            .pending_nonces
            .remove(nonce_commitment)
            .ok_or_else(|| PrivacyError::Mixing("unknown or already-consumed nonce commitment".into()))?;

        let blinded_signature = blind_sign::sign_blinded(nonce, &self.signer, blinded_challenge)?;
        state.issued_signatures += 1;

        let total_participants = state.registered_commitments.len();
        if state.issued_signatures >= total_participants {
            apply_event(state, MixingEvent::AllSignaturesIssued, now)?;
        }
        Ok(blinded_signature)
    }

    fn abort_session(&self, session: SessionId, reason: &str) {
        let mut sessions = self.sessions.lock().expect("mixing session mutex poisoned");
        if let Some(state) = sessions.get_mut(&session) {
            tracing::warn!(session, reason, "aborting mixing session");
            let _ = state.session.apply(MixingEvent::Abort);
        }
    }

    fn session_phase(&self, session: SessionId, now: u64) -> Option<MixingPhase> {
        let mut sessions = self.sessions.lock().expect("mixing session mutex poisoned");
        let state = sessions.get_mut(&session)?;
        self.check_timeout(state, now);
        Some(state.session.phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn honest_transfer_verifies() {
        let service = PrivacyService::new(0).unwrap();
        let data = service.build_transfer(FixedPoint::from_base_units(5_000_000_00), FixedPoint::from_base_units(1_00)).unwrap();
        assert!(service.verify_transfer(&data));
    }

    #[test]
    fn tampered_commitment_is_rejected() {
        let service = PrivacyService::new(0).unwrap();
        let mut data = service.build_transfer(FixedPoint::from_base_units(10), FixedPoint::from_base_units(1)).unwrap();
        data.amount_commitment[0] ^= 0xFF;
        assert!(!service.verify_transfer(&data));
    }

    #[test]
    fn full_mixing_session_happy_path() {
        let service = PrivacyService::new(0).unwrap();
        let denomination = FixedPoint::from_base_units(100_000_000);
        let session = service.create_session(denomination, 2, 1_000);

        let blinding_a = commitment::random_blinding();
        let blinding_b = commitment::random_blinding();
        let commitment_a = commitment::compress(&commitment::commit(100_000_000, &blinding_a)).to_vec();
        let commitment_b = commitment::compress(&commitment::commit(100_000_000, &blinding_b)).to_vec();

        service.register_participant(session, commitment_a, 1_001).unwrap();
        let phase = service.register_participant(session, commitment_b, 1_002).unwrap();
        assert_eq!(phase, MixingPhase::Verification);

        let phase = service.verify_commitments(session, 1_003).unwrap();
        assert_eq!(phase, MixingPhase::Signing);

        for i in 0..2 {
            let nonce_commitment = service.request_signing_nonce(session).unwrap();
            let message = format!("output-{i}");
            let (state, blinded_challenge) =
                blind_sign::blind_message(message.as_bytes(), &service.mixing_signer_public_key(), &nonce_commitment).unwrap();
            let blinded_signature = service.issue_output_signature(session, &nonce_commitment, &blinded_challenge, 1_004).unwrap();
            let signature = blind_sign::unblind(&state, &blinded_signature).unwrap();
            assert!(blind_sign::verify(message.as_bytes(), &service.mixing_signer_public_key(), &signature).unwrap());
        }

        assert_eq!(service.session_phase(session, 1_005), Some(MixingPhase::Completed));
    }

    #[test]
    fn session_times_out_while_waiting_in_registration() {
        let service = PrivacyService::new(0).unwrap();
        let session = service.create_session(FixedPoint::from_base_units(1), 5, 0);
        service.register_participant(session, vec![1, 2, 3], 0).unwrap();

        let far_future = PhaseTimeouts::default().registration.as_secs() + 1;
        assert_eq!(service.session_phase(session, far_future), Some(MixingPhase::Failed));
    }

    #[test]
    fn aborting_a_session_marks_it_failed() {
        let service = PrivacyService::new(0).unwrap();
        let session = service.create_session(FixedPoint::from_base_units(1), 2, 0);
        service.abort_session(session, "operator requested shutdown");
        assert_eq!(service.session_phase(session, 0), Some(MixingPhase::Failed));
    }
}
