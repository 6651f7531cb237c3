//! Inbound port: the P2P engine contract node-runtime's transport adapter
//! depends on.

use shared_types::{ConsensusParams, HelloPayload, Hash, PeerId, PeerInfo};

use crate::domain::errors::P2pError;

/// Tracks every connected peer's lifecycle state and reputation, and
/// decides what to relay. Owns no sockets: node-runtime's transport
/// adapter calls in on connect/handshake/disconnect/message events and
/// acts on the decisions this engine returns.
pub trait P2pEngine: Send + Sync {
    /// Register a newly dialed or accepted connection.
    fn begin_connect(&self, peer_id: PeerId, address: String) -> Result<PeerInfo, P2pError>;

    /// Transport-level connection established; advance to `Connected`.
    fn mark_transport_established(&self, peer_id: &PeerId) -> Result<PeerInfo, P2pError>;

    /// Begin the `HELLO` exchange; advance to `Handshaking`.
    fn begin_handshake(&self, peer_id: &PeerId) -> Result<PeerInfo, P2pError>;

    /// Validate an inbound `HELLO` against local identity and, on
    /// success, advance the peer to `Active`.
    fn complete_handshake(&self, peer_id: &PeerId, hello: &HelloPayload) -> Result<PeerInfo, P2pError>;

    /// Tear down a connection (graceful or due to error).
    fn disconnect(&self, peer_id: &PeerId) -> Result<PeerInfo, P2pError>;

    /// Finalize teardown back to `Disconnected`.
    fn mark_disconnected(&self, peer_id: &PeerId) -> Result<PeerInfo, P2pError>;

    /// Apply a reputation delta (positive for good behavior, negative for
    /// protocol violations); bans the peer outright if the score crosses
    /// the configured floor.
    fn adjust_reputation(&self, peer_id: &PeerId, delta: i32) -> Result<PeerInfo, P2pError>;

    /// Ban a peer immediately regardless of its current reputation.
    fn ban(&self, peer_id: &PeerId, reason: &str) -> Result<PeerInfo, P2pError>;

    /// Current record for a peer, if tracked.
    fn peer_info(&self, peer_id: &PeerId) -> Option<PeerInfo>;

    /// Whether a peer is currently banned.
    fn is_banned(&self, peer_id: &PeerId) -> bool;

    /// Number of peers currently in `Active` state.
    fn active_peer_count(&self) -> usize;

    /// Whether the node should seek out more peers.
    fn needs_more_peers(&self) -> bool;

    /// Addresses of every peer not currently disconnected or banned, used
    /// to avoid redialing a peer the transport is already connected to.
    fn known_peer_addresses(&self) -> Vec<String>;

    /// Whether room remains under the peer cap for a new connection.
    fn has_capacity(&self) -> bool;

    /// Decide whether a gossiped message should be relayed further,
    /// recording it as seen either way.
    fn should_relay(&self, message_hash: Hash) -> bool;

    /// Consensus parameters this engine is operating under.
    fn params(&self) -> &ConsensusParams;
}
