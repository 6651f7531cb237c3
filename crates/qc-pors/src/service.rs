//! The PoRS engine service: wires an authoritative chunk store into the
//! pure domain rules for chunking, challenge issuance/verification,
//! reliability scoring, quorum aggregation, and replication control.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use quantum_telemetry::{PORS_CHALLENGES_ISSUED, PORS_CHALLENGE_RESPONSES, PORS_UNDER_REPLICATED_CHUNKS, SUBSYSTEM_ERRORS};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared_types::{ConsensusParams, Hash, PeerId, QuorumSignature};
use tracing::instrument;

use crate::domain::challenge::{self, Challenge, ChallengeKindRequest};
use crate::domain::chunk::{self, Chunk};
use crate::domain::errors::PorsError;
use crate::domain::quorum;
use crate::domain::reliability::{ewma_update, is_reliable};
use crate::domain::replication::{self, ReplicationDecision};
use crate::ports::inbound::PorsEngine;
use crate::ports::outbound::ChunkSource;

pub struct PorsEngineService<C> {
    chunk_source: C,
    params: ConsensusParams,
    rng: RwLock<StdRng>,
    reliability: RwLock<HashMap<PeerId, f64>>,
    replication_failures: RwLock<HashMap<PeerId, u32>>,
    seen_challenge_ids: RwLock<HashSet<Hash>>,
}

impl<C: ChunkSource> PorsEngineService<C> {
    pub fn new(chunk_source: C, params: ConsensusParams) -> Self {
        Self {
            chunk_source,
            params,
            rng: RwLock::new(StdRng::from_entropy()),
            reliability: RwLock::new(HashMap::new()),
            replication_failures: RwLock::new(HashMap::new()),
            seen_challenge_ids: RwLock::new(HashSet::new()),
        }
    }

    /// Construct with a seeded RNG, for deterministic tests.
    #[cfg(test)]
    pub fn with_seed(chunk_source: C, params: ConsensusParams, seed: u64) -> Self {
        Self {
            chunk_source,
            params,
            rng: RwLock::new(StdRng::seed_from_u64(seed)),
            reliability: RwLock::new(HashMap::new()),
            replication_failures: RwLock::new(HashMap::new()),
            seen_challenge_ids: RwLock::new(HashSet::new()),
        }
    }
}

impl<C: ChunkSource> PorsEngine for PorsEngineService<C> {
    fn chunk_payload(&self, data: &[u8]) -> Vec<Chunk> {
        chunk::split_into_chunks(data, self.params.pors_chunk_size_bytes)
    }

    #[instrument(skip(self))]
    fn issue_challenge(&self, chunk_id: Hash, chunk_len: usize, kind: ChallengeKindRequest, timestamp: u64) -> Result<Challenge, PorsError> {
        let mut rng = self.rng.write().expect("rng lock poisoned");
        let result = challenge::generate_challenge(
            &mut *rng,
            chunk_id,
            chunk_len,
            kind,
            self.params.pors_sample_min_indices,
            timestamp,
        );
        match &result {
            Ok(_) => PORS_CHALLENGES_ISSUED.inc(),
            Err(_) => {
                SUBSYSTEM_ERRORS.with_label_values(&["pors", "challenge_generation_failed"]).inc();
            }
        }
        result
    }

    #[instrument(skip(self, challenge))]
    fn verify_and_record(
        &self,
        peer_id: &PeerId,
        challenge: &Challenge,
        response_challenge_id: Hash,
        response_proof: Hash,
    ) -> Result<bool, PorsError> {
        let bytes = self.chunk_source.chunk_bytes(&challenge.chunk_id).ok_or(PorsError::UnknownChunk)?;
        let accepted = challenge::verify_response(&bytes, challenge, response_challenge_id, response_proof)?;

        PORS_CHALLENGE_RESPONSES.with_label_values(&[if accepted { "accepted" } else { "rejected" }]).inc();

        let mut scores = self.reliability.write().expect("reliability lock poisoned");
        let score = scores.entry(peer_id.clone()).or_insert(1.0);
        *score = ewma_update(*score, accepted, self.params.pors_ewma_alpha);

        Ok(accepted)
    }

    fn reliability_score(&self, peer_id: &PeerId) -> f64 {
        *self.reliability.read().expect("reliability lock poisoned").get(peer_id).unwrap_or(&0.0)
    }

    fn is_reliable(&self, peer_id: &PeerId) -> bool {
        is_reliable(self.reliability_score(peer_id), self.params.pors_verification_threshold)
    }

    #[instrument(skip(self, signatures))]
    fn aggregate_quorum(&self, challenge_id: Hash, signatures: Vec<QuorumSignature>) -> Result<Vec<QuorumSignature>, PorsError> {
        let mut seen = self.seen_challenge_ids.write().expect("seen_challenge_ids lock poisoned");
        let result = quorum::aggregate_quorum(challenge_id, signatures, self.params.pors_quorum_size, &seen);
        match &result {
            Ok(_) => {
                seen.insert(challenge_id);
            }
            Err(_) => {
                SUBSYSTEM_ERRORS.with_label_values(&["pors", "quorum_rejected"]).inc();
            }
        }
        result
    }

    fn evaluate_replication(&self, _chunk_id: Hash, observed_replicas: usize) -> ReplicationDecision {
        let decision = replication::evaluate_replication(
            observed_replicas,
            self.params.pors_min_replication,
            self.params.pors_replication_factor,
        );
        if matches!(decision, ReplicationDecision::Schedule { .. }) {
            PORS_UNDER_REPLICATED_CHUNKS.inc();
        }
        decision
    }

    fn note_replication_failure(&self, peer_id: &PeerId) -> (u64, bool) {
        let mut failures = self.replication_failures.write().expect("replication_failures lock poisoned");
        let count = failures.entry(peer_id.clone()).or_insert(0);
        *count += 1;
        let backoff = replication::backoff_duration_secs(count.saturating_sub(1), self.params.p2p_ban_base_secs, self.params.p2p_ban_max_secs);
        // A peer banned for persistent storage failure is judged by the
        // same ban-escalation knobs the P2P layer uses for misbehavior,
        // rather than a separate PoRS-only threshold.
        let ban_after = 5;
        let banned = replication::should_ban_peer(*count, ban_after);
        (backoff, banned)
    }

    fn note_replication_success(&self, peer_id: &PeerId) {
        self.replication_failures.write().expect("replication_failures lock poisoned").remove(peer_id);
    }

    fn params(&self) -> &ConsensusParams {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::PublicKey;
    use std::collections::HashMap as StdHashMap;

    struct MapChunkSource(StdHashMap<Hash, Vec<u8>>);
    impl ChunkSource for MapChunkSource {
        fn chunk_bytes(&self, chunk_id: &Hash) -> Option<Vec<u8>> {
            self.0.get(chunk_id).cloned()
        }
    }

    fn peer(byte: u8) -> PeerId {
        PublicKey([byte; 33])
    }

    fn service_with(data: &[u8]) -> (PorsEngineService<MapChunkSource>, Hash) {
        let id = chunk::chunk_id(data);
        let mut map = StdHashMap::new();
        map.insert(id, data.to_vec());
        (PorsEngineService::with_seed(MapChunkSource(map), ConsensusParams::default(), 7), id)
    }

    #[test]
    fn chunk_payload_matches_configured_size() {
        let params = ConsensusParams { pors_chunk_size_bytes: 10, ..ConsensusParams::default() };
        let service = PorsEngineService::with_seed(MapChunkSource(StdHashMap::new()), params, 1);
        let chunks = service.chunk_payload(&vec![0u8; 25]);
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn honest_response_accepted_and_improves_reliability() {
        let data = b"a chunk a node genuinely stores".to_vec();
        let (service, chunk_id) = service_with(&data);
        let challenge = service.issue_challenge(chunk_id, data.len(), ChallengeKindRequest::Hash, 100).unwrap();
        let proof = challenge::expected_proof(&data, &challenge).unwrap();

        let honest_peer = peer(1);
        let accepted = service.verify_and_record(&honest_peer, &challenge, challenge.challenge_id, proof).unwrap();
        assert!(accepted);
        assert!(service.is_reliable(&honest_peer));
    }

    #[test]
    fn wrong_proof_is_rejected_and_lowers_reliability() {
        let data = b"a chunk".to_vec();
        let (service, chunk_id) = service_with(&data);
        let challenge = service.issue_challenge(chunk_id, data.len(), ChallengeKindRequest::Hash, 1).unwrap();

        let dishonest_peer = peer(2);
        let accepted = service.verify_and_record(&dishonest_peer, &challenge, challenge.challenge_id, [0u8; 32]).unwrap();
        assert!(!accepted);
        assert!(!service.is_reliable(&dishonest_peer));
    }

    #[test]
    fn unknown_chunk_is_an_error() {
        let service = PorsEngineService::with_seed(MapChunkSource(StdHashMap::new()), ConsensusParams::default(), 1);
        let challenge = Challenge { challenge_id: [1u8; 32], chunk_id: [9u8; 32], kind: crate::domain::challenge::ChallengeKind::Hash, timestamp: 0 };
        let result = service.verify_and_record(&peer(1), &challenge, [1u8; 32], [0u8; 32]);
        assert!(matches!(result, Err(PorsError::UnknownChunk)));
    }

    #[test]
    fn quorum_rejects_reuse_of_a_challenge_id() {
        use shared_crypto::Secp256k1KeyPair;

        let service = PorsEngineService::with_seed(MapChunkSource(StdHashMap::new()), ConsensusParams { pors_quorum_size: 1, ..ConsensusParams::default() }, 1);
        let challenge_id = [5u8; 32];
        let keypair = Secp256k1KeyPair::from_bytes([6u8; 32]).expect("valid seed");
        let sig = QuorumSignature {
            node_id: PublicKey(*keypair.public_key().as_bytes()),
            signature: keypair.sign(&challenge_id),
        };
        assert!(service.aggregate_quorum(challenge_id, vec![sig.clone()]).is_ok());
        assert!(matches!(service.aggregate_quorum(challenge_id, vec![sig]), Err(PorsError::ChallengeIdReused)));
    }

    #[test]
    fn replication_failure_escalates_to_ban_after_repeated_failures() {
        let service = PorsEngineService::with_seed(MapChunkSource(StdHashMap::new()), ConsensusParams::default(), 1);
        let flaky_peer = peer(3);
        let mut banned = false;
        for _ in 0..5 {
            let (_, b) = service.note_replication_failure(&flaky_peer);
            banned = b;
        }
        assert!(banned);
    }

    #[test]
    fn replication_success_clears_failure_streak() {
        let service = PorsEngineService::with_seed(MapChunkSource(StdHashMap::new()), ConsensusParams::default(), 1);
        let flaky_peer = peer(4);
        service.note_replication_failure(&flaky_peer);
        service.note_replication_success(&flaky_peer);
        let (_, banned) = service.note_replication_failure(&flaky_peer);
        assert!(!banned);
    }
}
