//! `HELLO` handshake validation (spec.md §4.9): a mismatched network id or
//! a node id equal to the local node's own (a self-connection, typically
//! from a loopback dial during discovery) causes the peer to be
//! disconnected before it ever reaches `Active`.

use shared_types::{HelloPayload, PeerId};

use super::errors::P2pError;

/// Validate an incoming `HELLO` against local identity. Returns the
/// peer's declared chain height on success, for the caller to stash on
/// its `PeerInfo`.
pub fn validate_hello(local_node_id: &PeerId, local_network_id: &str, hello: &HelloPayload) -> Result<u64, P2pError> {
    if &hello.node_id == local_node_id {
        return Err(P2pError::SelfConnection);
    }
    if hello.network_id != local_network_id {
        return Err(P2pError::NetworkMismatch { expected: local_network_id.to_string(), got: hello.network_id.clone() });
    }
    Ok(hello.chain_height)
}
