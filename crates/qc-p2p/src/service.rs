//! The P2P engine service: an in-memory peer table driven by the state
//! machine, handshake, reputation, and gossip-dedup domain rules. No
//! sockets are opened here — node-runtime's transport adapter is the
//! thing actually reading and writing bytes.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use quantum_telemetry::{PEERS_CONNECTED, PEERS_DISCOVERED, PEER_BANS, PEER_CONNECTIONS, SUBSYSTEM_ERRORS};
use shared_types::{ConsensusParams, HelloPayload, Hash, PeerId, PeerInfo, PeerState};
use tracing::instrument;

use crate::domain::errors::P2pError;
use crate::domain::gossip::GossipDedup;
use crate::domain::handshake::validate_hello;
use crate::domain::reputation::{apply_delta, ban_duration_secs, crosses_ban_threshold};
use crate::domain::state_machine::{next_state, PeerEvent};
use crate::ports::inbound::P2pEngine;

const GOSSIP_FILTER_BITS: usize = 1 << 20;
const GOSSIP_FILTER_K: usize = 4;
const GOSSIP_FILTER_RESET_AFTER: usize = 200_000;

fn now_unix() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs()
}

/// A peer's ban has lapsed once wall-clock time reaches `banned_until`. A
/// peer with no `banned_until` recorded is treated as still banned rather
/// than silently let back in.
fn ban_has_expired(peer: &PeerInfo) -> bool {
    peer.banned_until.map(|until| now_unix() >= until).unwrap_or(false)
}

pub struct P2pEngineService {
    local_node_id: PeerId,
    local_network_id: String,
    params: ConsensusParams,
    peers: RwLock<HashMap<PeerId, PeerInfo>>,
    ban_counts: RwLock<HashMap<PeerId, u32>>,
    gossip_dedup: Mutex<GossipDedup>,
}

impl P2pEngineService {
    pub fn new(local_node_id: PeerId, local_network_id: String, params: ConsensusParams) -> Self {
        Self {
            local_node_id,
            local_network_id,
            params,
            peers: RwLock::new(HashMap::new()),
            ban_counts: RwLock::new(HashMap::new()),
            gossip_dedup: Mutex::new(GossipDedup::new(GOSSIP_FILTER_BITS, GOSSIP_FILTER_K, GOSSIP_FILTER_RESET_AFTER)),
        }
    }

    fn with_peer<F>(&self, peer_id: &PeerId, f: F) -> Result<PeerInfo, P2pError>
    where
        F: FnOnce(&mut PeerInfo) -> Result<(), P2pError>,
    {
        let mut peers = self.peers.write().expect("peers lock poisoned");
        let peer = peers.get_mut(peer_id).ok_or(P2pError::UnknownPeer)?;
        f(peer)?;
        Ok(peer.clone())
    }

    fn transition(&self, peer_id: &PeerId, event: PeerEvent) -> Result<PeerInfo, P2pError> {
        self.with_peer(peer_id, |peer| {
            peer.state = next_state(peer.state, event)?;
            Ok(())
        })
    }
}

impl P2pEngine for P2pEngineService {
    #[instrument(skip(self))]
    fn begin_connect(&self, peer_id: PeerId, address: String) -> Result<PeerInfo, P2pError> {
        if !self.has_capacity() {
            return Err(P2pError::AtCapacity);
        }
        let mut peers = self.peers.write().expect("peers lock poisoned");
        if let Some(existing) = peers.get(&peer_id) {
            if existing.state == PeerState::Banned && !ban_has_expired(existing) {
                return Err(P2pError::Banned);
            }
        }
        let mut info = PeerInfo::new(peer_id.clone(), address);
        info.reputation = self.params.p2p_initial_reputation;
        info.state = next_state(info.state, PeerEvent::Connect)?;
        peers.insert(peer_id, info.clone());
        PEERS_DISCOVERED.inc();
        Ok(info)
    }

    fn mark_transport_established(&self, peer_id: &PeerId) -> Result<PeerInfo, P2pError> {
        self.transition(peer_id, PeerEvent::TransportEstablished)
    }

    fn begin_handshake(&self, peer_id: &PeerId) -> Result<PeerInfo, P2pError> {
        self.transition(peer_id, PeerEvent::BeginHandshake)
    }

    #[instrument(skip(self, hello))]
    fn complete_handshake(&self, peer_id: &PeerId, hello: &HelloPayload) -> Result<PeerInfo, P2pError> {
        let validation = validate_hello(&self.local_node_id, &self.local_network_id, hello);
        if let Err(err) = validation {
            SUBSYSTEM_ERRORS.with_label_values(&["p2p", "handshake_rejected"]).inc();
            let _ = self.with_peer(peer_id, |peer| {
                peer.state = next_state(peer.state, PeerEvent::Disconnect).unwrap_or(peer.state);
                Ok(())
            });
            return Err(err);
        }
        let chain_height = validation.expect("checked above");

        let info = self.with_peer(peer_id, |peer| {
            peer.state = next_state(peer.state, PeerEvent::HandshakeAccepted)?;
            peer.network_id = Some(hello.network_id.clone());
            peer.chain_height = Some(chain_height);
            Ok(())
        })?;
        PEERS_CONNECTED.inc();
        PEER_CONNECTIONS.with_label_values(&["success"]).inc();
        Ok(info)
    }

    fn disconnect(&self, peer_id: &PeerId) -> Result<PeerInfo, P2pError> {
        let info = self.transition(peer_id, PeerEvent::Disconnect)?;
        PEERS_CONNECTED.dec();
        Ok(info)
    }

    fn mark_disconnected(&self, peer_id: &PeerId) -> Result<PeerInfo, P2pError> {
        self.transition(peer_id, PeerEvent::Disconnected)
    }

    #[instrument(skip(self))]
    fn adjust_reputation(&self, peer_id: &PeerId, delta: i32) -> Result<PeerInfo, P2pError> {
        let should_ban = {
            let mut peers = self.peers.write().expect("peers lock poisoned");
            let peer = peers.get_mut(peer_id).ok_or(P2pError::UnknownPeer)?;
            peer.reputation = apply_delta(peer.reputation, delta);
            crosses_ban_threshold(peer.reputation, self.params.p2p_ban_threshold)
        };
        if should_ban {
            return self.ban(peer_id, "reputation fell below ban threshold");
        }
        self.peers.read().expect("peers lock poisoned").get(peer_id).cloned().ok_or(P2pError::UnknownPeer)
    }

    #[instrument(skip(self))]
    fn ban(&self, peer_id: &PeerId, _reason: &str) -> Result<PeerInfo, P2pError> {
        let mut ban_counts = self.ban_counts.write().expect("ban_counts lock poisoned");
        let count = ban_counts.entry(peer_id.clone()).or_insert(0);
        let duration = ban_duration_secs(*count, self.params.p2p_ban_base_secs, self.params.p2p_ban_max_secs);
        *count += 1;

        let info = self.with_peer(peer_id, |peer| {
            peer.state = next_state(peer.state, PeerEvent::Ban)?;
            peer.ban_count += 1;
            peer.banned_until = Some(now_unix() + duration);
            Ok(())
        })?;
        PEER_BANS.inc();
        Ok(info)
    }

    fn peer_info(&self, peer_id: &PeerId) -> Option<PeerInfo> {
        self.peers.read().expect("peers lock poisoned").get(peer_id).cloned()
    }

    fn is_banned(&self, peer_id: &PeerId) -> bool {
        self.peer_info(peer_id).map(|p| p.state == PeerState::Banned && !ban_has_expired(&p)).unwrap_or(false)
    }

    fn active_peer_count(&self) -> usize {
        self.peers.read().expect("peers lock poisoned").values().filter(|p| p.state == PeerState::Active).count()
    }

    fn needs_more_peers(&self) -> bool {
        self.active_peer_count() < self.params.p2p_min_peers
    }

    fn known_peer_addresses(&self) -> Vec<String> {
        self.peers
            .read()
            .expect("peers lock poisoned")
            .values()
            .filter(|p| p.state != PeerState::Disconnected && p.state != PeerState::Banned)
            .map(|p| p.address.clone())
            .collect()
    }

    fn has_capacity(&self) -> bool {
        self.peers.read().expect("peers lock poisoned").values().filter(|p| p.state != PeerState::Disconnected && p.state != PeerState::Banned).count()
            < self.params.p2p_max_peers
    }

    fn should_relay(&self, message_hash: Hash) -> bool {
        self.gossip_dedup.lock().expect("gossip_dedup lock poisoned").should_relay(&message_hash)
    }

    fn params(&self) -> &ConsensusParams {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::PublicKey;

    fn local() -> PeerId {
        PublicKey([0u8; 33])
    }

    fn peer(byte: u8) -> PeerId {
        PublicKey([byte; 33])
    }

    fn hello(node_id: PeerId, network_id: &str) -> HelloPayload {
        HelloPayload { node_id, version: 1, user_agent: "qc/0.1".into(), network_id: network_id.into(), chain_height: 5 }
    }

    fn service() -> P2pEngineService {
        P2pEngineService::new(local(), "mainnet".into(), ConsensusParams::default())
    }

    #[test]
    fn full_handshake_reaches_active_state() {
        let svc = service();
        let p = peer(1);
        svc.begin_connect(p.clone(), "10.0.0.1:9000".into()).unwrap();
        svc.mark_transport_established(&p).unwrap();
        svc.begin_handshake(&p).unwrap();
        let info = svc.complete_handshake(&p, &hello(p.clone(), "mainnet")).unwrap();
        assert_eq!(info.state, PeerState::Active);
        assert_eq!(svc.active_peer_count(), 1);
    }

    #[test]
    fn self_connection_is_rejected_and_torn_down() {
        let svc = service();
        let me = local();
        svc.begin_connect(me.clone(), "10.0.0.2:9000".into()).unwrap();
        svc.mark_transport_established(&me).unwrap();
        svc.begin_handshake(&me).unwrap();
        let result = svc.complete_handshake(&me, &hello(me.clone(), "mainnet"));
        assert!(matches!(result, Err(P2pError::SelfConnection)));
        assert_ne!(svc.peer_info(&me).unwrap().state, PeerState::Active);
    }

    #[test]
    fn network_mismatch_is_rejected() {
        let svc = service();
        let p = peer(2);
        svc.begin_connect(p.clone(), "10.0.0.3:9000".into()).unwrap();
        svc.mark_transport_established(&p).unwrap();
        svc.begin_handshake(&p).unwrap();
        let result = svc.complete_handshake(&p, &hello(p.clone(), "testnet"));
        assert!(matches!(result, Err(P2pError::NetworkMismatch { .. })));
    }

    #[test]
    fn reputation_crossing_threshold_bans_the_peer() {
        let svc = service();
        let p = peer(3);
        svc.begin_connect(p.clone(), "10.0.0.4:9000".into()).unwrap();
        let info = svc.adjust_reputation(&p, -1000).unwrap();
        assert_eq!(info.state, PeerState::Banned);
        assert!(svc.is_banned(&p));
    }

    #[test]
    fn ban_records_an_absolute_expiry_in_the_future() {
        let svc = service();
        let p = peer(4);
        svc.begin_connect(p.clone(), "10.0.0.5:9000".into()).unwrap();
        let info = svc.adjust_reputation(&p, -1000).unwrap();
        let banned_until = info.banned_until.expect("ban sets an expiry");
        assert!(banned_until > now_unix());
    }

    #[test]
    fn reconnecting_after_ban_expiry_is_allowed() {
        let params = ConsensusParams { p2p_ban_base_secs: 0, p2p_ban_max_secs: 0, ..ConsensusParams::default() };
        let svc = P2pEngineService::new(local(), "mainnet".into(), params);
        let p = peer(5);
        svc.begin_connect(p.clone(), "10.0.0.6:9000".into()).unwrap();
        svc.adjust_reputation(&p, -1000).unwrap();
        assert!(!svc.is_banned(&p));
        let info = svc.begin_connect(p.clone(), "10.0.0.6:9000".into()).unwrap();
        assert_eq!(info.state, PeerState::Connecting);
    }

    #[test]
    fn reconnecting_while_still_banned_is_rejected() {
        let svc = service();
        let p = peer(6);
        svc.begin_connect(p.clone(), "10.0.0.7:9000".into()).unwrap();
        svc.adjust_reputation(&p, -1000).unwrap();
        assert!(svc.is_banned(&p));
        let result = svc.begin_connect(p.clone(), "10.0.0.7:9000".into());
        assert!(matches!(result, Err(P2pError::Banned)));
    }

    #[test]
    fn capacity_limit_rejects_new_connections() {
        let params = ConsensusParams { p2p_max_peers: 1, ..ConsensusParams::default() };
        let svc = P2pEngineService::new(local(), "mainnet".into(), params);
        svc.begin_connect(peer(1), "a".into()).unwrap();
        let result = svc.begin_connect(peer(2), "b".into());
        assert!(matches!(result, Err(P2pError::AtCapacity)));
    }

    #[test]
    fn gossip_dedup_suppresses_repeat_relay() {
        let svc = service();
        let hash = [9u8; 32];
        assert!(svc.should_relay(hash));
        assert!(!svc.should_relay(hash));
    }

    #[test]
    fn needs_more_peers_until_min_is_reached() {
        let params = ConsensusParams { p2p_min_peers: 1, ..ConsensusParams::default() };
        let svc = P2pEngineService::new(local(), "mainnet".into(), params);
        assert!(svc.needs_more_peers());
        let p = peer(1);
        svc.begin_connect(p.clone(), "a".into()).unwrap();
        svc.mark_transport_established(&p).unwrap();
        svc.begin_handshake(&p).unwrap();
        svc.complete_handshake(&p, &hello(p.clone(), "mainnet")).unwrap();
        assert!(!svc.needs_more_peers());
    }
}
