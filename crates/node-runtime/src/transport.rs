//! Wire transport: newline-delimited JSON [`WireFrame`]s over TCP
//! (spec.md §6). Connection lifecycle (dial/accept, handshake, ping/pong,
//! gossip relay, teardown) is driven entirely by the decisions
//! [`qc_p2p::P2pEngine`] returns; this module owns sockets and nothing
//! about peer state.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use shared_types::{Block, Hash, HelloPayload, MessageType, PeerId, Transaction, WireFrame};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

use qc_chain_store::ChainStore;
use qc_consensus::ConsensusDriver;
use qc_mempool::Mempool;
use qc_p2p::P2pEngine;
use shared_bus::{BlockchainEvent, EventPublisher};

use crate::wiring::{Node, PeerBook};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("peer engine rejected connection: {0}")]
    Rejected(#[from] qc_p2p::P2pError),
    #[error("connection closed")]
    Closed,
}

/// One outbound queue per connected peer; messages the rest of the node
/// wants relayed (new blocks, new transactions) are pushed here rather
/// than written directly, so a slow peer cannot block the producer.
pub type OutboundSender = mpsc::Sender<WireFrame>;

/// Live map of every handshake-complete peer's outbound queue. Populated
/// once a connection's `HELLO` resolves a `PeerId`, drained on teardown.
/// This is what lets a validated `NewBlock`/`NewTransaction` be relayed to
/// every other active connection instead of just acted on locally.
#[derive(Default)]
pub struct PeerRegistry {
    senders: RwLock<HashMap<PeerId, OutboundSender>>,
}

impl PeerRegistry {
    pub fn register(&self, peer_id: PeerId, sender: OutboundSender) {
        self.senders.write().expect("peer registry lock poisoned").insert(peer_id, sender);
    }

    pub fn unregister(&self, peer_id: &PeerId) {
        self.senders.write().expect("peer registry lock poisoned").remove(peer_id);
    }

    pub fn get(&self, peer_id: &PeerId) -> Option<OutboundSender> {
        self.senders.read().expect("peer registry lock poisoned").get(peer_id).cloned()
    }

    /// Every registered peer other than `exclude`, for gossip fan-out.
    pub fn others(&self, exclude: &PeerId) -> Vec<(PeerId, OutboundSender)> {
        self.senders
            .read()
            .expect("peer registry lock poisoned")
            .iter()
            .filter(|entry| entry.0 != exclude)
            .map(|(id, tx)| (id.clone(), tx.clone()))
            .collect()
    }
}

/// `GetPeers` is answered with the addresses this node's peer book
/// already knows, bare strings rather than `PeerId`s since an address
/// learned this way has no confirmed identity until dialed.
#[derive(Debug, Serialize, Deserialize)]
struct PeersPayload {
    addresses: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GetBlockPayload {
    index: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct GetTransactionPayload {
    id: Hash,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChainInfoPayload {
    height: u64,
    tip_hash: Hash,
}

pub fn now_unix() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn hello_frame(local_node_id: PeerId, node: &Node, network_id: &str, user_agent: &str) -> WireFrame {
    let chain_height = node.chain_store.latest().ok().flatten().map_or(0, |b| b.index());
    let payload = HelloPayload {
        node_id: local_node_id,
        version: 1,
        user_agent: user_agent.to_string(),
        network_id: network_id.to_string(),
        chain_height,
    };
    WireFrame::new(MessageType::Hello, local_node_id, serde_json::json!(payload), now_unix())
}

/// Read frames from `reader` and dispatch them against `node`'s wired
/// subsystems, writing any reply/relay frames onto `outbound`. Runs until
/// the connection closes or the peer is disconnected/banned.
#[instrument(skip(node, reader, outbound), fields(peer = %peer_address))]
async fn drive_connection(
    node: Arc<Node>,
    local_node_id: PeerId,
    peer_address: SocketAddr,
    mut reader: BufReader<tokio::net::tcp::OwnedReadHalf>,
    outbound: OutboundSender,
    mut peer_id: Option<PeerId>,
) -> Result<(), TransportError> {
    let mut line = String::new();
    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            break;
        }
        let frame: WireFrame = match serde_json::from_str(line.trim_end()) {
            Ok(f) => f,
            Err(err) => {
                warn!(%err, "dropping malformed frame from {peer_address}");
                continue;
            }
        };

        match frame.frame_type {
            MessageType::Hello => {
                let hello: HelloPayload = serde_json::from_value(frame.payload.clone())?;
                // The peer's id is only known once its `HELLO` arrives, so
                // registration with the engine (normally done at dial/accept
                // time when the id is already known, e.g. from the peer
                // book) happens here instead for a first-contact peer.
                if peer_id.is_none() {
                    node.p2p.begin_connect(hello.node_id, peer_address.to_string()).ok();
                    node.p2p.mark_transport_established(&hello.node_id).ok();
                    node.p2p.begin_handshake(&hello.node_id).ok();
                }
                match node.p2p.complete_handshake(&hello.node_id, &hello) {
                    Ok(info) => {
                        peer_id = Some(hello.node_id);
                        node.peer_registry.register(hello.node_id, outbound.clone());
                        node.peer_book.remember(hello.node_id, peer_address.to_string());
                        debug!(peer_id = ?hello.node_id, "handshake complete");
                        node.events.publish(BlockchainEvent::PeerDiscovered(info)).await;
                    }
                    Err(err) => {
                        warn!(%err, "handshake rejected");
                        return Err(TransportError::Rejected(err));
                    }
                }
            }
            MessageType::Ping => {
                let pong = WireFrame::new(MessageType::Pong, local_node_id, serde_json::json!({}), now_unix());
                outbound.send(pong).await.ok();
            }
            MessageType::Pong => {}
            MessageType::NewBlock | MessageType::Block => {
                let block: Block = serde_json::from_value(frame.payload.clone())?;
                let hash = block.block_hash();
                if node.p2p.should_relay(hash) {
                    let outcome = node.consensus.on_block_received(block.clone());
                    if let Some(id) = peer_id {
                        node.p2p.adjust_reputation(&id, reputation_delta_for(&outcome)).ok();
                    }
                    match outcome {
                        Ok(_) => {
                            node.events.publish(BlockchainEvent::BlockValidated(block.clone())).await;
                            node.events
                                .publish(BlockchainEvent::BlockStored { block_height: block.index(), block_hash: hash })
                                .await;
                            if let Some(source) = peer_id {
                                let relay = WireFrame::new(MessageType::NewBlock, local_node_id, serde_json::json!(block), now_unix());
                                relay_to_others(&node, &source, &relay).await;
                            }
                        }
                        Err(err) => {
                            node.events
                                .publish(BlockchainEvent::BlockRejected { hash, reason: err.to_string() })
                                .await;
                        }
                    }
                }
            }
            MessageType::NewTransaction | MessageType::Transaction => {
                let tx: Transaction = serde_json::from_value(frame.payload.clone())?;
                let hash = shared_crypto::blake3_hash(&tx.id);
                if node.p2p.should_relay(hash) {
                    node.events.publish(BlockchainEvent::TransactionReceived(tx.clone())).await;
                    match node.mempool.insert(tx.clone()) {
                        Ok(()) => {
                            node.events.publish(BlockchainEvent::TransactionValidated(tx.clone())).await;
                            if let Some(source) = peer_id {
                                let relay =
                                    WireFrame::new(MessageType::NewTransaction, local_node_id, serde_json::json!(tx), now_unix());
                                relay_to_others(&node, &source, &relay).await;
                            }
                        }
                        Err(err) => {
                            node.events
                                .publish(BlockchainEvent::TransactionRejected { id: tx.id, reason: err.to_string() })
                                .await
                        }
                    };
                }
            }
            MessageType::GetPeers => {
                let addresses = node.peer_book.known_addresses();
                let reply = WireFrame::new(MessageType::Peers, local_node_id, serde_json::json!(PeersPayload { addresses }), now_unix());
                outbound.send(reply).await.ok();
            }
            MessageType::Peers => {
                let payload: PeersPayload = serde_json::from_value(frame.payload.clone())?;
                for addr in payload.addresses {
                    node.peer_book.remember_discovered(addr);
                }
            }
            MessageType::GetBlock => {
                let payload: GetBlockPayload = serde_json::from_value(frame.payload.clone())?;
                if let Ok(Some(block)) = node.chain_store.get_by_index(payload.index) {
                    let reply = WireFrame::new(MessageType::Block, local_node_id, serde_json::json!(block), now_unix());
                    outbound.send(reply).await.ok();
                }
            }
            MessageType::GetTransaction => {
                let payload: GetTransactionPayload = serde_json::from_value(frame.payload.clone())?;
                let found = node.mempool.by_fee(None, node.mempool.len()).into_iter().find(|tx| tx.id == payload.id);
                let found = match found {
                    Some(tx) => Some(tx),
                    None => node.chain_store.get_tx(&payload.id).ok().flatten(),
                };
                if let Some(tx) = found {
                    let reply = WireFrame::new(MessageType::Transaction, local_node_id, serde_json::json!(tx), now_unix());
                    outbound.send(reply).await.ok();
                }
            }
            MessageType::GetChainInfo => {
                let tip = node.chain_store.latest().ok().flatten();
                let payload = ChainInfoPayload {
                    height: tip.as_ref().map_or(0, |b| b.index()),
                    tip_hash: tip.as_ref().map_or([0u8; 32], |b| b.block_hash()),
                };
                let reply = WireFrame::new(MessageType::ChainInfo, local_node_id, serde_json::json!(payload), now_unix());
                outbound.send(reply).await.ok();
            }
            MessageType::ChainInfo => {
                let payload: ChainInfoPayload = serde_json::from_value(frame.payload.clone())?;
                let our_height = node.chain_store.latest().ok().flatten().map_or(0, |b| b.index());
                if payload.height > our_height {
                    let request = WireFrame::new(
                        MessageType::GetBlock,
                        local_node_id,
                        serde_json::json!(GetBlockPayload { index: our_height + 1 }),
                        now_unix(),
                    );
                    outbound.send(request).await.ok();
                }
            }
        }
    }

    if let Some(id) = peer_id {
        node.peer_registry.unregister(&id);
        node.p2p.mark_disconnected(&id).ok();
        node.events.publish(BlockchainEvent::PeerDisconnected(id)).await;
    }
    Ok(())
}

/// Fan a frame out to every registered peer other than `exclude` (the one
/// it arrived from, if any), so gossip propagates beyond a single hop.
async fn relay_to_others(node: &Node, exclude: &PeerId, frame: &WireFrame) {
    for (_, sender) in node.peer_registry.others(exclude) {
        sender.send(frame.clone()).await.ok();
    }
}

fn reputation_delta_for(outcome: &Result<qc_consensus::BlockOutcome, qc_consensus::ConsensusError>) -> i32 {
    match outcome {
        Ok(_) => 1,
        Err(_) => -10,
    }
}

async fn write_loop(mut writer: tokio::net::tcp::OwnedWriteHalf, mut outbound: mpsc::Receiver<WireFrame>) {
    while let Some(frame) = outbound.recv().await {
        let Ok(mut bytes) = serde_json::to_vec(&frame) else { continue };
        bytes.push(b'\n');
        if writer.write_all(&bytes).await.is_err() {
            break;
        }
    }
}

/// Accept one inbound connection: register it with the `P2pEngine`, spawn
/// the read/write halves, and send our own `HELLO` first.
async fn handle_inbound(
    node: Arc<Node>,
    local_node_id: PeerId,
    network_id: String,
    user_agent: String,
    stream: TcpStream,
    peer_address: SocketAddr,
) -> Result<(), TransportError> {
    let (read_half, write_half) = stream.into_split();
    let reader = BufReader::new(read_half);
    let (tx, rx) = mpsc::channel::<WireFrame>(64);

    tx.send(hello_frame(local_node_id, &node, &network_id, &user_agent)).await.ok();

    let writer_task = tokio::spawn(write_loop(write_half, rx));
    let result = drive_connection(node, local_node_id, peer_address, reader, tx, None).await;
    writer_task.abort();
    result
}

/// Bind `bind_addr` and accept connections forever, spawning one task per
/// peer. Returns only on a fatal bind error.
pub async fn run_listener(
    node: Arc<Node>,
    local_node_id: PeerId,
    network_id: String,
    user_agent: String,
    bind_addr: SocketAddr,
) -> Result<(), TransportError> {
    let listener = TcpListener::bind(bind_addr).await?;
    debug!(%bind_addr, "p2p listener bound");
    loop {
        let (stream, peer_address) = listener.accept().await?;
        let node = node.clone();
        let network_id = network_id.clone();
        let user_agent = user_agent.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_inbound(node, local_node_id, network_id, user_agent, stream, peer_address).await {
                warn!(%err, %peer_address, "peer connection ended");
            }
        });
    }
}

/// Dial a bootstrap peer and run the same connection loop as an inbound
/// accept, from the other side of the handshake.
pub async fn dial_peer(
    node: Arc<Node>,
    local_node_id: PeerId,
    network_id: String,
    user_agent: String,
    address: SocketAddr,
) -> Result<(), TransportError> {
    let stream = TcpStream::connect(address).await?;
    handle_inbound(node, local_node_id, network_id, user_agent, stream, address).await
}
