//! Inbound ports: what the rest of the node depends on from this crate.

use shared_types::{Address, ConfidentialData, FixedPoint};

use crate::domain::errors::PrivacyError;
use crate::domain::mixing::MixingPhase;
use crate::domain::stealth::StealthHint;

/// Opaque identifier for a mixing session, scoped to a single running
/// node (not persisted across restarts).
pub type SessionId = u64;

/// Builds and verifies confidential transfers: Pedersen commitments to an
/// amount and fee, bound by range proofs, per spec.md §4.11.
pub trait ConfidentialTransferBuilder: Send + Sync {
    /// Commit to `amount` and `fee`, returning the wire-ready commitment
    /// and range proof bundle. Blinding factors are generated and
    /// discarded internally; the caller already knows its own amount and
    /// fee, so nothing further needs to be retained to reconstruct them.
    fn build_transfer(&self, amount: FixedPoint, fee: FixedPoint) -> Result<ConfidentialData, PrivacyError>;

    /// Checks a confidential transfer's range proofs without learning
    /// the amount or fee. Implements `qc_validator`'s
    /// `ConfidentialProofVerifier` outbound port directly.
    fn verify_transfer(&self, data: &ConfidentialData) -> bool;
}

/// Derives and recognizes stealth payment hints, per spec.md §4.11.
pub trait StealthAddressing: Send + Sync {
    /// Sender side: derive a fresh one-time address for a recipient
    /// identified by their scan/spend public keys.
    fn derive_hint(&self, recipient_scan_pubkey: &[u8; 33], recipient_spend_pubkey: &[u8; 33]) -> Result<StealthHint, PrivacyError>;

    /// Recipient side: does `candidate` belong to this recipient given
    /// `ephemeral_pubkey` from an observed transaction?
    fn recognize_hint(
        &self,
        scan_secret: &[u8; 32],
        spend_pubkey: &[u8; 33],
        ephemeral_pubkey: &[u8; 33],
        candidate: &Address,
    ) -> Result<bool, PrivacyError>;
}

/// Drives coin-mixing sessions through
/// `Created -> Registration -> Verification -> Signing -> Completed`,
/// per spec.md §4.11.
pub trait MixingCoordinator: Send + Sync {
    /// Open a new fixed-denomination session.
    fn create_session(&self, denomination: FixedPoint, min_participants: usize, now: u64) -> SessionId;

    /// Register a participant's input commitment. Advances the session
    /// out of `Created`/`Registration` once enough participants have
    /// joined.
    fn register_participant(&self, session: SessionId, input_commitment: Vec<u8>, now: u64) -> Result<MixingPhase, PrivacyError>;

    /// Verify every registered commitment matches the session's
    /// denomination, advancing to `Signing` on success and pre-generating
    /// one signer nonce per participant.
    fn verify_commitments(&self, session: SessionId, now: u64) -> Result<MixingPhase, PrivacyError>;

    /// Claim one of the session's pre-generated signer nonce commitments.
    /// Deliberately identity-free: any caller holding a registered input
    /// for this session can claim a nonce and later request a signature
    /// with it, so the coordinator never learns which input funded which
    /// output.
    fn request_signing_nonce(&self, session: SessionId) -> Result<[u8; 33], PrivacyError>;

    /// Sign a previously claimed nonce commitment's blinded challenge,
    /// advancing to `Completed` once every participant has one. Returns
    /// the signer's raw blinded response; the caller must unblind it
    /// locally (the coordinator never sees the unblinded signature) via
    /// [`crate::domain::blind_sign::unblind`].
    fn issue_output_signature(
        &self,
        session: SessionId,
        nonce_commitment: &[u8; 33],
        blinded_challenge: &[u8; 32],
        now: u64,
    ) -> Result<[u8; 32], PrivacyError>;

    /// Abort a session outright; registered funds remain unspent.
    fn abort_session(&self, session: SessionId, reason: &str);

    /// The session's current phase, checking for and applying a
    /// phase-timeout transition first.
    fn session_phase(&self, session: SessionId, now: u64) -> Option<MixingPhase>;
}
