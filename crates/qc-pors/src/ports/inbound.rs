//! Inbound port: the PoRS engine contract the consensus driver depends on.

use shared_types::{ConsensusParams, Hash, PeerId, QuorumSignature};

use crate::domain::challenge::{Challenge, ChallengeKindRequest};
use crate::domain::chunk::Chunk;
use crate::domain::errors::PorsError;
use crate::domain::replication::ReplicationDecision;

/// Chunks payloads, runs the storage-challenge protocol, tracks per-node
/// reliability, aggregates quorum attestations, and schedules replication.
/// Does not assemble a full `Block` or distribute storage rewards — the
/// consensus driver owns chain position, header hashing, and the reward
/// table.
pub trait PorsEngine: Send + Sync {
    /// Split a payload into fixed-size chunks per policy.
    fn chunk_payload(&self, data: &[u8]) -> Vec<Chunk>;

    /// Draw and record a fresh challenge for `chunk_id`.
    fn issue_challenge(&self, chunk_id: Hash, chunk_len: usize, kind: ChallengeKindRequest, timestamp: u64) -> Result<Challenge, PorsError>;

    /// Verify a prover's response against this engine's authoritative copy
    /// of the chunk, then fold the outcome into that peer's reliability
    /// score.
    fn verify_and_record(
        &self,
        peer_id: &PeerId,
        challenge: &Challenge,
        response_challenge_id: Hash,
        response_proof: Hash,
    ) -> Result<bool, PorsError>;

    /// Current reliability score for a peer (0.0 if never observed).
    fn reliability_score(&self, peer_id: &PeerId) -> f64;

    /// Whether a peer currently clears the reliability threshold.
    fn is_reliable(&self, peer_id: &PeerId) -> bool;

    /// Aggregate a challenge round's attestations into the distinct signer
    /// set a PoRS block's proof will carry, enforcing the quorum size and
    /// the one-time-use rule on `challenge_id`. On success, the
    /// `challenge_id` is marked used.
    fn aggregate_quorum(&self, challenge_id: Hash, signatures: Vec<QuorumSignature>) -> Result<Vec<QuorumSignature>, PorsError>;

    /// Evaluate a chunk's observed replica count against policy.
    fn evaluate_replication(&self, chunk_id: Hash, observed_replicas: usize) -> ReplicationDecision;

    /// Record a failed replication attempt toward `peer_id`, returning the
    /// backoff to wait before retrying and whether the peer should now be
    /// banned.
    fn note_replication_failure(&self, peer_id: &PeerId) -> (u64, bool);

    /// Clear a peer's replication failure streak after a success.
    fn note_replication_success(&self, peer_id: &PeerId);

    /// Consensus parameters this engine is operating under.
    fn params(&self) -> &ConsensusParams;
}
