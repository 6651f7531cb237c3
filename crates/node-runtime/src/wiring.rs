//! Subsystem wiring: constructs every service crate behind its chosen
//! adapter and threads the outbound ports each one needs from the
//! others. This is the composition root — nothing downstream of here
//! constructs a service; it only receives one already wired.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

use qc_chain_store::{ChainStore, ChainStoreService, SledKVStore, StoreError};
use qc_compute::ComputeEngine;
use qc_consensus::ConsensusDriverService;
use qc_mempool::{Mempool, MempoolService};
use qc_porw::{FoldingTarget, FoldingTargetSource, PorwEngineService};
use qc_pors::{ChunkSource, PorsEngineService};
use qc_privacy::PrivacyService;
use qc_state::{StateManager, StateService};
use qc_validator::ValidatorService;
use shared_bus::{EventPublisher, InMemoryEventBus};
use shared_types::{Address, Block, BlockType, ConsensusParams, FixedPoint, Hash, PeerId, StateSnapshot, Transaction};

use crate::config::NodeConfig;

/// Thin `Arc` wrapper whose sole purpose is to carry a foreign port trait
/// impl on a locally-defined type, letting the same underlying service be
/// shared by value across every consumer that needs it (`qc-validator`'s
/// outbound ports, `qc-consensus`'s inbound ports) without cloning the
/// service itself.
pub struct Shared<T>(pub Arc<T>);

impl<T> Shared<T> {
    fn new(inner: T) -> Self {
        Self(Arc::new(inner))
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<K: qc_chain_store::KeyValueStore> ChainStore for Shared<ChainStoreService<K>> {
    fn append(&self, block: &Block) -> Result<(), StoreError> {
        self.0.append(block)
    }
    fn get_by_index(&self, index: u64) -> Result<Option<Block>, StoreError> {
        self.0.get_by_index(index)
    }
    fn get_by_hash(&self, hash: &Hash) -> Result<Option<Block>, StoreError> {
        self.0.get_by_hash(hash)
    }
    fn latest(&self) -> Result<Option<Block>, StoreError> {
        self.0.latest()
    }
    fn latest_by_type(&self, block_type: BlockType, before_index: Option<u64>) -> Result<Option<Block>, StoreError> {
        self.0.latest_by_type(block_type, before_index)
    }
    fn range(&self, start: u64, end: u64) -> Result<Vec<Block>, StoreError> {
        self.0.range(start, end)
    }
    fn get_tx(&self, id: &Hash) -> Result<Option<Transaction>, StoreError> {
        self.0.get_tx(id)
    }
    fn txs_for_address(&self, address: &Address, since_tx: Option<Hash>) -> Result<Vec<Transaction>, StoreError> {
        self.0.txs_for_address(address, since_tx)
    }
    fn truncate_above(&self, index: u64) -> Result<(), StoreError> {
        self.0.truncate_above(index)
    }
}

impl StateManager for Shared<StateService> {
    fn apply(&self, block: &Block) -> Result<(), qc_state::StateError> {
        self.0.apply(block)
    }
    fn revert(&self, block: &Block) -> Result<(), qc_state::StateError> {
        self.0.revert(block)
    }
    fn balance(&self, address: &Address) -> FixedPoint {
        self.0.balance(address)
    }
    fn snapshot(&self) -> StateSnapshot {
        self.0.snapshot()
    }
    fn verify(&self, chain_store: &dyn ChainStore) -> Result<bool, qc_state::StateError> {
        self.0.verify(chain_store)
    }
}

impl Mempool for Shared<MempoolService> {
    fn insert(&self, tx: Transaction) -> Result<(), qc_mempool::MempoolError> {
        self.0.insert(tx)
    }
    fn remove(&self, id: &Hash) -> Option<Transaction> {
        self.0.remove(id)
    }
    fn remove_included(&self, block: &Block) {
        self.0.remove_included(block)
    }
    fn candidates_from_reverted(&self, block: &Block) -> Vec<Transaction> {
        self.0.candidates_from_reverted(block)
    }
    fn by_fee(&self, min_fee: Option<FixedPoint>, limit: usize) -> Vec<Transaction> {
        self.0.by_fee(min_fee, limit)
    }
    fn for_address(&self, address: &Address) -> Vec<Transaction> {
        self.0.for_address(address)
    }
    fn contains(&self, id: &Hash) -> bool {
        self.0.contains(id)
    }
    fn len(&self) -> usize {
        self.0.len()
    }
}

impl qc_validator::ports::outbound::BalanceSource for Shared<StateService> {
    fn balance(&self, address: &Address) -> FixedPoint {
        StateManager::balance(self, address)
    }
}

impl qc_validator::ports::outbound::TotalSupplySource for Shared<StateService> {
    fn total_supply(&self) -> FixedPoint {
        self.0.snapshot().total_supply
    }
}

impl qc_validator::ports::outbound::ConfidentialProofVerifier for Shared<PrivacyService> {
    fn verify(&self, data: &shared_types::ConfidentialData) -> bool {
        qc_validator::ports::outbound::ConfidentialProofVerifier::verify(&*self.0, data)
    }
}

/// Storage-backed [`ChunkSource`]: the authoritative local copy of every
/// chunk this node has accepted custody of (spec.md §4.8). Challenge
/// verification reads from this, never from a peer's claimed bytes.
pub struct SledChunkStore {
    tree: sled::Db,
}

impl SledChunkStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, sled::Error> {
        Ok(Self { tree: sled::open(path)? })
    }

    pub fn put_chunk(&self, id: Hash, data: &[u8]) -> Result<(), sled::Error> {
        self.tree.insert(id, data)?;
        Ok(())
    }
}

impl Shared<SledChunkStore> {
    pub fn put_chunk(&self, id: Hash, data: &[u8]) -> Result<(), sled::Error> {
        self.0.put_chunk(id, data)
    }
}

impl ChunkSource for Shared<SledChunkStore> {
    fn chunk_bytes(&self, chunk_id: &Hash) -> Option<Vec<u8>> {
        self.0.tree.get(chunk_id).ok().flatten().map(|v| v.to_vec())
    }
}

/// In-memory [`FoldingTargetSource`]: node-runtime has no scientific
/// scorer of its own (spec.md §4.7 treats ranking as entirely external),
/// so this just serves whatever the external feed last pushed via
/// [`LiveFoldingTargets::set_ranked`].
#[derive(Default)]
pub struct LiveFoldingTargets {
    ranked: RwLock<Vec<FoldingTarget>>,
}

impl LiveFoldingTargets {
    pub fn set_ranked(&self, targets: Vec<FoldingTarget>) {
        *self.ranked.write().expect("folding target list poisoned") = targets;
    }
}

impl FoldingTargetSource for Shared<LiveFoldingTargets> {
    fn ranked_targets(&self) -> Vec<FoldingTarget> {
        self.0.ranked.read().expect("folding target list poisoned").clone()
    }
}

type ChainStoreHandle = Shared<ChainStoreService<SledKVStore>>;
type StateHandle = Shared<StateService>;
type MempoolHandle = Shared<MempoolService>;
type PrivacyHandle = Shared<PrivacyService>;

/// Every validator/consensus combination shares one [`ChainStoreHandle`],
/// one [`StateHandle`], and one [`MempoolHandle`] rather than each
/// constructing its own, so a block applied through one view is visible
/// to every other.
pub type WiredValidator =
    ValidatorService<ChainStoreHandle, StateHandle, PrivacyHandle, StateHandle>;
pub type WiredConsensus =
    ConsensusDriverService<ChainStoreHandle, StateHandle, MempoolHandle, WiredValidator>;

/// Every constructed subsystem a running node needs, ready for
/// `main.rs`'s transport and cadence loops to drive.
pub struct Node {
    pub chain_store: ChainStoreHandle,
    pub state: StateHandle,
    pub mempool: MempoolHandle,
    pub privacy: PrivacyHandle,
    pub consensus: Arc<WiredConsensus>,
    pub porw: Arc<PorwEngineService<Shared<LiveFoldingTargets>>>,
    pub pors: Arc<PorsEngineService<Shared<SledChunkStore>>>,
    pub p2p: Arc<qc_p2p::P2pEngineService>,
    pub folding_targets: Shared<LiveFoldingTargets>,
    pub chunk_store: Shared<SledChunkStore>,
    /// Choreography bus (spec.md §0): block/transaction/peer lifecycle
    /// events published here for any in-process listener (metrics,
    /// future RPC surface) without those listeners needing a direct
    /// reference to the subsystem that produced the event.
    pub events: Arc<InMemoryEventBus>,
    /// Live outbound queues for every handshake-complete peer, used by
    /// `transport` to relay gossip and answer sync requests.
    pub peer_registry: Arc<crate::transport::PeerRegistry>,
    pub peer_book: Arc<PeerBook>,
}

#[derive(Debug, thiserror::Error)]
pub enum WiringError {
    #[error("cannot open chain store at {path}: {source}")]
    ChainStore { path: String, source: StoreError },
    #[error("cannot open chunk store at {path}: {source}")]
    ChunkStore { path: String, source: sled::Error },
    #[error("cannot initialize privacy subsystem: {0}")]
    Privacy(#[from] qc_privacy::PrivacyError),
    #[error("no compute backend available: {0}")]
    Compute(#[from] qc_compute::ComputeError),
}

/// Build every subsystem from `config`, wiring shared handles through the
/// outbound ports each one needs. `local_node_id` and `local_network_id`
/// seed the `P2pEngine`'s handshake identity (spec.md §6).
pub fn wire(config: &NodeConfig, local_node_id: PeerId) -> Result<Node, WiringError> {
    std::fs::create_dir_all(&config.storage.data_dir).ok();

    let kv = SledKVStore::open(config.storage.blocks_dir())
        .map_err(|source| WiringError::ChainStore { path: config.storage.blocks_dir().display().to_string(), source })?;
    let chain_store = Shared::new(ChainStoreService::new(kv));

    let state = Shared::new(StateService::new());

    let mempool = Shared::new(MempoolService::new(config.mempool.max_transactions, config.mempool.max_bytes));

    let privacy = Shared::new(PrivacyService::new(shared_crypto::address::VERSION_MAINNET)?);

    let validator = ValidatorService::new(
        chain_store.clone(),
        state.clone(),
        privacy.clone(),
        state.clone(),
        config.consensus.clone(),
    );

    let consensus = Arc::new(ConsensusDriverService::new(
        chain_store.clone(),
        state.clone(),
        mempool.clone(),
        validator,
        config.consensus.clone(),
    ));

    let compute: Arc<dyn ComputeEngine> = qc_compute::auto_detect()?;
    let folding_targets = Shared::new(LiveFoldingTargets::default());
    let porw = Arc::new(PorwEngineService::new(folding_targets.clone(), compute, config.consensus.clone()));

    let chunk_store = Shared::new(
        SledChunkStore::open(config.storage.chunk_storage_dir())
            .map_err(|source| WiringError::ChunkStore { path: config.storage.chunk_storage_dir().display().to_string(), source })?,
    );
    let pors = Arc::new(PorsEngineService::new(chunk_store.clone(), config.consensus.clone()));

    let p2p = Arc::new(qc_p2p::P2pEngineService::new(
        local_node_id,
        config.network.network_id.clone(),
        config.consensus.clone(),
    ));

    let events = Arc::new(InMemoryEventBus::new());

    let peer_registry = Arc::new(crate::transport::PeerRegistry::default());
    let peer_book = Arc::new(PeerBook::load(&config.storage.peers_file()));

    Ok(Node {
        chain_store,
        state,
        mempool,
        privacy,
        consensus,
        porw,
        pors,
        p2p,
        folding_targets,
        chunk_store,
        events,
        peer_registry,
        peer_book,
    })
}

/// Seed a freshly wired node's chain store with the genesis block if (and
/// only if) it has no blocks yet. Idempotent: a node restarting against
/// an existing data directory leaves its chain untouched.
pub async fn ensure_genesis(node: &Node, timestamp: u64) -> Result<(), WiringError> {
    if node.chain_store.latest().ok().flatten().is_some() {
        return Ok(());
    }
    let genesis = crate::genesis::build_genesis(timestamp)
        .map_err(|_| WiringError::ChainStore { path: "<genesis>".to_string(), source: StoreError::Conflict("cannot hash genesis".to_string()) })?;
    node.chain_store.append(&genesis).map_err(|source| WiringError::ChainStore { path: "<genesis>".to_string(), source })?;
    node.state.apply(&genesis).map_err(|_| WiringError::ChainStore { path: "<genesis>".to_string(), source: StoreError::Conflict("cannot apply genesis".to_string()) })?;
    node.events
        .publish(shared_bus::BlockchainEvent::GenesisInitialized {
            block_hash: genesis.block_hash(),
            height: genesis.index(),
            timestamp,
        })
        .await;
    Ok(())
}

/// Peer-address book persisted to `peers.json` (spec.md §6), loaded at
/// startup and rewritten whenever a peer's address is first learned.
///
/// Addresses learned from a completed handshake are keyed by `peer_id` and
/// persisted; addresses learned only from a peer's `PEERS` reply have no
/// confirmed identity yet and are kept in `discovered` instead — ephemeral,
/// re-learned each run rather than written to disk.
#[derive(Default)]
pub struct PeerBook {
    addresses: Mutex<HashMap<PeerId, String>>,
    discovered: Mutex<HashSet<String>>,
}

impl PeerBook {
    /// `peers.json` holds a JSON array of `[peer_id, address]` pairs
    /// rather than an object keyed by `peer_id`: `PeerId` serializes as a
    /// byte array, and JSON object keys must be strings.
    pub fn load(path: &Path) -> Self {
        let addresses = std::fs::read(path)
            .ok()
            .and_then(|bytes| serde_json::from_slice::<Vec<(PeerId, String)>>(&bytes).ok())
            .map(|entries| entries.into_iter().collect::<HashMap<_, _>>())
            .unwrap_or_default();
        Self { addresses: Mutex::new(addresses), discovered: Mutex::new(HashSet::new()) }
    }

    pub fn remember(&self, peer_id: PeerId, address: String) {
        self.addresses.lock().expect("peer book mutex poisoned").insert(peer_id, address);
    }

    /// Record an address learned from a peer's `PEERS` reply, with no
    /// confirmed `peer_id` yet.
    pub fn remember_discovered(&self, address: String) {
        self.discovered.lock().expect("peer book mutex poisoned").insert(address);
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let snapshot: Vec<(PeerId, String)> =
            self.addresses.lock().expect("peer book mutex poisoned").clone().into_iter().collect();
        let bytes = serde_json::to_vec_pretty(&snapshot)?;
        std::fs::write(path, bytes)
    }

    /// Every address this node knows of, handshake-confirmed or not,
    /// for `GetPeers` replies and the discovery dial loop.
    pub fn known_addresses(&self) -> Vec<String> {
        let confirmed = self.addresses.lock().expect("peer book mutex poisoned").values().cloned().collect::<HashSet<_>>();
        confirmed.union(&self.discovered.lock().expect("peer book mutex poisoned")).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeConfig;

    fn test_config(dir: &std::path::Path) -> NodeConfig {
        let mut config = NodeConfig::default();
        config.storage.data_dir = dir.to_path_buf();
        config
    }

    #[test]
    fn wiring_produces_a_node_with_no_chain_yet() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = test_config(dir.path());
        let node = wire(&config, PeerId([7u8; 33])).expect("wire node");
        assert!(node.chain_store.latest().expect("latest").is_none());
    }

    #[tokio::test]
    async fn ensure_genesis_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = test_config(dir.path());
        let node = wire(&config, PeerId([7u8; 33])).expect("wire node");
        ensure_genesis(&node, 1_700_000_000).await.expect("first genesis");
        let first_tip = node.chain_store.latest().expect("latest").expect("some tip");
        ensure_genesis(&node, 1_700_000_000).await.expect("second call is a no-op");
        let second_tip = node.chain_store.latest().expect("latest").expect("some tip");
        assert_eq!(first_tip.block_hash(), second_tip.block_hash());
    }

    #[test]
    fn peer_book_round_trips_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("peers.json");
        let book = PeerBook::default();
        book.remember(PeerId([1u8; 33]), "127.0.0.1:8333".to_string());
        book.save(&path).expect("save");

        let reloaded = PeerBook::load(&path);
        assert_eq!(reloaded.known_addresses(), vec!["127.0.0.1:8333".to_string()]);
    }
}
