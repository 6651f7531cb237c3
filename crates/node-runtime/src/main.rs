//! Quantum-Chain node binary: loads configuration, wires every
//! subsystem, seeds genesis, starts the P2P listener and bootstrap
//! dials, and runs the PoRS production cadence until interrupted.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use node_runtime::config::NodeConfig;
use node_runtime::{transport, wiring};
use qc_chain_store::ChainStore;
use qc_consensus::ConsensusDriver;
use qc_p2p::P2pEngine;
use shared_crypto::Secp256k1KeyPair;
use shared_types::{MessageType, PublicKey, WireFrame};
use tracing::{error, info, warn};

struct Args {
    config_path: Option<PathBuf>,
    testnet: bool,
}

fn parse_args() -> Args {
    let mut config_path = None;
    let mut testnet = false;
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => config_path = iter.next().map(PathBuf::from),
            "--testnet" => testnet = true,
            other => warn!(arg = other, "ignoring unrecognized argument"),
        }
    }
    Args { config_path, testnet }
}

/// Load this node's persistent identity keypair from `data_dir/node_key`,
/// generating and persisting a fresh one on first run.
fn load_or_create_identity(data_dir: &std::path::Path) -> anyhow::Result<Secp256k1KeyPair> {
    let key_path = data_dir.join("node_key");
    if let Ok(bytes) = std::fs::read(&key_path) {
        if bytes.len() == 32 {
            let array: [u8; 32] = bytes.try_into().expect("checked length above");
            return Ok(Secp256k1KeyPair::from_bytes(array)?);
        }
        warn!(path = %key_path.display(), "node_key file has unexpected length, regenerating");
    }
    let keypair = Secp256k1KeyPair::generate();
    std::fs::create_dir_all(data_dir)?;
    std::fs::write(&key_path, keypair.to_bytes())?;
    info!(path = %key_path.display(), "generated new node identity");
    Ok(keypair)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = parse_args();
    let config = NodeConfig::load(args.config_path.as_deref())?;
    let config = if args.testnet { config.with_testnet_defaults() } else { config };

    let telemetry_config = quantum_telemetry::TelemetryConfig::for_subsystem("node", "runtime");
    let _telemetry = quantum_telemetry::init_telemetry(telemetry_config)
        .await
        .map_err(|err| anyhow::anyhow!("telemetry init failed: {err}"))?;

    info!(network_id = %config.network.network_id, bind = %config.network.p2p_bind, "starting node");

    let identity = load_or_create_identity(&config.storage.data_dir)?;
    let local_node_id = PublicKey(*identity.public_key().as_bytes());

    let node = Arc::new(wiring::wire(&config, local_node_id)?);

    let genesis_timestamp = 1_700_000_000;
    wiring::ensure_genesis(&node, genesis_timestamp).await?;
    let tip = node
        .chain_store
        .latest()
        .map_err(|err| anyhow::anyhow!("chain store unavailable at startup: {err}"))?;
    info!(height = ?tip.as_ref().map(|b| b.index()), "chain store ready");

    let listener_node = node.clone();
    let listener_network_id = config.network.network_id.clone();
    let listener_user_agent = config.network.user_agent.clone();
    let bind_addr = config.network.p2p_bind;
    let listener_handle = tokio::spawn(async move {
        if let Err(err) = transport::run_listener(listener_node, local_node_id, listener_network_id, listener_user_agent, bind_addr).await {
            error!(%err, "p2p listener terminated");
        }
    });

    for addr in &config.network.bootstrap_peers {
        let node = node.clone();
        let network_id = config.network.network_id.clone();
        let user_agent = config.network.user_agent.clone();
        let addr = *addr;
        tokio::spawn(async move {
            if let Err(err) = transport::dial_peer(node, local_node_id, network_id, user_agent, addr).await {
                warn!(%err, %addr, "bootstrap dial failed");
            }
        });
    }

    let discovery_node = node.clone();
    let discovery_network_id = config.network.network_id.clone();
    let discovery_user_agent = config.network.user_agent.clone();
    let discovery_handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(30));
        loop {
            ticker.tick().await;

            if discovery_node.p2p.needs_more_peers() {
                let connected = discovery_node.p2p.known_peer_addresses();
                for addr in discovery_node.peer_book.known_addresses() {
                    if !discovery_node.p2p.has_capacity() || connected.contains(&addr) {
                        continue;
                    }
                    let Ok(socket_addr) = addr.parse() else { continue };
                    let node = discovery_node.clone();
                    let network_id = discovery_network_id.clone();
                    let user_agent = discovery_user_agent.clone();
                    tokio::spawn(async move {
                        if let Err(err) = transport::dial_peer(node, local_node_id, network_id, user_agent, socket_addr).await {
                            warn!(%err, %socket_addr, "peer discovery dial failed");
                        }
                    });
                }
            }

            let request = WireFrame::new(MessageType::GetPeers, local_node_id, serde_json::json!({}), transport::now_unix());
            for (_, sender) in discovery_node.peer_registry.others(&local_node_id) {
                sender.send(request.clone()).await.ok();
            }
        }
    });

    let identity = Arc::new(identity);
    let porw_node = node.clone();
    let porw_identity = identity.clone();
    let porw_interval = config.consensus.porw_target_interval_secs.max(1);
    let porw_handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(porw_interval));
        loop {
            ticker.tick().await;
            if let Err(err) = node_runtime::production::try_produce_porw(&porw_node, &porw_identity, local_node_id).await {
                warn!(%err, "PoRW production attempt failed");
            }
        }
    });

    let pors_node = node.clone();
    let pors_identity = identity.clone();
    let pors_interval = config.consensus.pors_block_interval_secs.max(1);
    let cadence_handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(pors_interval));
        loop {
            ticker.tick().await;
            let now = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            match pors_node.consensus.pors_production_due(now) {
                Ok(true) => {
                    if let Err(err) = node_runtime::production::try_produce_pors(&pors_node, &pors_identity, local_node_id, now).await {
                        warn!(%err, "PoRS production attempt failed");
                    }
                }
                Ok(false) => {}
                Err(err) => warn!(%err, "failed to check PoRS production cadence"),
            }
        }
    });

    tokio::signal::ctrl_c().await.ok();
    info!("shutdown signal received");
    listener_handle.abort();
    cadence_handle.abort();
    porw_handle.abort();
    discovery_handle.abort();
    node.peer_book.save(&config.storage.peers_file()).ok();
    Ok(())
}
