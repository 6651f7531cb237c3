//! # Wire envelope
//!
//! The frame shape every P2P message is wrapped in, newline-delimited JSON
//! over the wire (see spec §6). Adapted from the teacher's
//! `AuthenticatedMessage<T>` envelope: the header/payload split and the
//! generic-over-payload shape survive, but the request/reply/nonce-replay
//! machinery is dropped — the PoRW/PoRS gossip protocol has no
//! request/response correlation beyond `GET_*`/reply pairs already
//! expressed by `MessageType`, and dedup is handled by `qc-p2p`'s bloom
//! filter rather than a nonce cache.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::PeerId;

/// The `type` field of a wire frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Hello,
    Ping,
    Pong,
    GetPeers,
    Peers,
    NewBlock,
    GetBlock,
    Block,
    NewTransaction,
    GetTransaction,
    Transaction,
    GetChainInfo,
    ChainInfo,
}

/// A wire frame: `{id, type, sender, receiver?, timestamp, payload}`.
///
/// `payload` is left as raw JSON (`serde_json::Value`) rather than generic
/// over `T`, since a single frame's `type` field determines which concrete
/// payload to deserialize into at the call site — unlike the teacher's
/// envelope, which is generic because each IPC channel carries exactly one
/// payload type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireFrame {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub frame_type: MessageType,
    pub sender: PeerId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver: Option<PeerId>,
    pub timestamp: u64,
    pub payload: serde_json::Value,
}

impl WireFrame {
    #[must_use]
    pub fn new(
        frame_type: MessageType,
        sender: PeerId,
        payload: serde_json::Value,
        timestamp: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            frame_type,
            sender,
            receiver: None,
            timestamp,
            payload,
        }
    }

    #[must_use]
    pub fn with_receiver(mut self, receiver: PeerId) -> Self {
        self.receiver = Some(receiver);
        self
    }
}

/// `HELLO` handshake payload: node id, version, network id, declared chain
/// height. A mismatched `network_id` or a `node_id` matching the local
/// node's own id (self-connection) causes the peer to be disconnected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloPayload {
    pub node_id: PeerId,
    pub version: u16,
    pub user_agent: String,
    pub network_id: String,
    pub chain_height: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_round_trips_through_json() {
        let sender: PeerId = crate::entities::PublicKey([3u8; 33]);
        let frame = WireFrame::new(MessageType::Ping, sender, serde_json::json!({}), 42);
        let encoded = serde_json::to_string(&frame).unwrap();
        let decoded: WireFrame = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.timestamp, 42);
        assert_eq!(decoded.frame_type, MessageType::Ping);
    }
}
