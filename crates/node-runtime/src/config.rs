//! Node configuration: network, storage, and consensus parameters.
//!
//! Loaded from an optional TOML file (`--config path/to/node.toml`) layered
//! over built-in defaults; fields absent from the file simply keep their
//! default. Nothing here is a consensus-critical secret, so there is no
//! environment-variable override layer beyond what `quantum_telemetry`
//! already does for its own settings.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use shared_types::ConsensusParams;
use thiserror::Error;

/// Default mainnet P2P port (spec.md §6).
pub const MAINNET_P2P_PORT: u16 = 8333;
/// Default testnet P2P port (spec.md §6).
pub const TESTNET_P2P_PORT: u16 = 3000;
/// Default PoRS storage-service port (spec.md §6).
pub const STORAGE_SERVICE_PORT: u16 = 3500;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },
}

/// Network-facing settings: what to bind, who to dial first, and how this
/// node identifies itself in the `HELLO` handshake.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Distinguishes mainnet from testnet/devnet; a `HELLO` with a
    /// mismatched value causes the peer to be disconnected.
    pub network_id: String,
    /// Local P2P listen address.
    pub p2p_bind: SocketAddr,
    /// Addresses supplied out of band to seed discovery.
    pub bootstrap_peers: Vec<SocketAddr>,
    /// `user_agent` string carried in this node's own `HELLO`.
    pub user_agent: String,
    /// Wire protocol version carried in `HELLO`.
    pub protocol_version: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            network_id: "mainnet".to_string(),
            p2p_bind: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), MAINNET_P2P_PORT),
            bootstrap_peers: Vec::new(),
            user_agent: format!("quantum-chain/{}", env!("CARGO_PKG_VERSION")),
            protocol_version: 1,
        }
    }
}

/// Where this node's persisted state lives on disk, per spec.md §6:
/// `blocks/`, `state/`, `peers.json`, `mempool.log`, and — for storage
/// nodes — `storage/`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    /// Use the durable `sled`-backed chain store instead of the in-memory
    /// one; the in-memory adapter is for tests and ephemeral devnets.
    pub durable: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_dir: PathBuf::from("./data"), durable: true }
    }
}

impl StorageConfig {
    #[must_use]
    pub fn blocks_dir(&self) -> PathBuf {
        self.data_dir.join("blocks")
    }

    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        self.data_dir.join("state")
    }

    #[must_use]
    pub fn peers_file(&self) -> PathBuf {
        self.data_dir.join("peers.json")
    }

    #[must_use]
    pub fn mempool_log(&self) -> PathBuf {
        self.data_dir.join("mempool.log")
    }

    #[must_use]
    pub fn chunk_storage_dir(&self) -> PathBuf {
        self.data_dir.join("storage")
    }
}

/// Mempool capacity, independent of consensus-critical parameters since
/// every node may size its own pool differently.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MempoolConfig {
    pub max_transactions: usize,
    pub max_bytes: usize,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self { max_transactions: 5_000, max_bytes: 64 * 1024 * 1024 }
    }
}

/// Complete node configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub network: NetworkConfig,
    pub storage: StorageConfig,
    pub mempool: MempoolConfig,
    /// Consensus-critical parameters. Every node validating the same
    /// chain must run with identical values; these are pinned in the
    /// genesis block's metadata, not renegotiated over the wire.
    pub consensus: ConsensusParams,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            storage: StorageConfig::default(),
            mempool: MempoolConfig::default(),
            consensus: ConsensusParams::default(),
        }
    }
}

impl NodeConfig {
    /// Load from a TOML file, falling back to built-in defaults for any
    /// field the file omits. `None` yields pure defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        toml::from_str(&raw)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source: Box::new(source) })
    }

    /// Switch the network port defaults between mainnet and testnet when
    /// the config file didn't pin an explicit `p2p_bind` port.
    #[must_use]
    pub fn with_testnet_defaults(mut self) -> Self {
        if self.network.p2p_bind.port() == MAINNET_P2P_PORT {
            self.network.p2p_bind.set_port(TESTNET_P2P_PORT);
        }
        if self.network.network_id == "mainnet" {
            self.network.network_id = "testnet".to_string();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_mainnet_port() {
        let config = NodeConfig::default();
        assert_eq!(config.network.p2p_bind.port(), MAINNET_P2P_PORT);
        assert_eq!(config.network.network_id, "mainnet");
    }

    #[test]
    fn testnet_defaults_switch_port_and_network_id() {
        let config = NodeConfig::default().with_testnet_defaults();
        assert_eq!(config.network.p2p_bind.port(), TESTNET_P2P_PORT);
        assert_eq!(config.network.network_id, "testnet");
    }

    #[test]
    fn load_parses_a_partial_toml_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("node.toml");
        std::fs::write(&path, "[network]\nnetwork_id = \"devnet\"\n").expect("write config");
        let config = NodeConfig::load(Some(&path)).expect("load config");
        assert_eq!(config.network.network_id, "devnet");
        assert_eq!(config.mempool.max_transactions, MempoolConfig::default().max_transactions);
    }

    #[test]
    fn load_rejects_malformed_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("node.toml");
        std::fs::write(&path, "not valid toml {{{").expect("write config");
        assert!(matches!(NodeConfig::load(Some(&path)), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn storage_layout_matches_spec_directories() {
        let storage = StorageConfig { data_dir: PathBuf::from("/var/qc"), durable: true };
        assert_eq!(storage.blocks_dir(), PathBuf::from("/var/qc/blocks"));
        assert_eq!(storage.state_dir(), PathBuf::from("/var/qc/state"));
        assert_eq!(storage.peers_file(), PathBuf::from("/var/qc/peers.json"));
        assert_eq!(storage.mempool_log(), PathBuf::from("/var/qc/mempool.log"));
        assert_eq!(storage.chunk_storage_dir(), PathBuf::from("/var/qc/storage"));
    }
}
