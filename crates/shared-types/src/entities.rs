//! Core domain entities: addresses, transactions, the two block variants,
//! proofs, state snapshots, and peer metadata.
//!
//! These types carry no behavior beyond construction and accessors — the
//! rules that govern them (signature verification, balance checks, proof
//! acceptance) live in `qc-validator`, `qc-porw`, and `qc-pors`, which take
//! these types as input rather than methods on them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};

/// A 32-byte digest, used for block hashes, transaction ids, and
/// content-addressed references (e.g. `protein_data_ref`).
pub type Hash = [u8; 32];

/// DER-encoded secp256k1 ECDSA signature. Unlike a fixed-size Ed25519
/// signature, DER encoding is variable length (typically 70-72 bytes), so
/// this is a `Vec<u8>` rather than a fixed array.
pub type Signature = Vec<u8>;

/// 33-byte SEC1-compressed secp256k1 public key.
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey(#[serde_as(as = "Bytes")] pub [u8; 33]);

impl PublicKey {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 33] {
        &self.0
    }
}

/// Reserved sender address for coinbase-style mint transactions.
pub const ZERO_ADDRESS: &str = "1111111111111111111111111111";

/// Base58Check-encoded address: 1-byte version, 20-byte hash160-equivalent,
/// 4-byte checksum. Construction from a string re-validates the checksum;
/// construction from raw parts (`from_parts`) is used only by the crypto
/// layer that has already computed the hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Wrap an already Base58Check-encoded string without re-validating it.
    /// Used by `shared-crypto::address` right after encoding, where the
    /// checksum is known good by construction.
    #[must_use]
    pub fn new_unchecked(encoded: String) -> Self {
        Self(encoded)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == ZERO_ADDRESS
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = crate::errors::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Checksum validity is enforced by shared-crypto::address::decode;
        // this crate only owns the newtype shape, not the hashing.
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for Address {
    type Error = crate::errors::CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.0
    }
}

/// Status of a transaction as tracked through mempool and chain lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Confirmed,
    Rejected,
}

/// Ciphertext bundle produced by ECDH + HKDF-SHA256 + XChaCha20-Poly1305
/// memo encryption (see `qc-privacy`).
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedMemo {
    /// Ephemeral public key used for the ECDH exchange.
    pub ephemeral_pubkey: PublicKey,
    /// 24-byte XChaCha20 nonce.
    #[serde_as(as = "Bytes")]
    pub nonce: [u8; 24],
    /// AEAD ciphertext, includes the Poly1305 tag.
    pub ciphertext: Vec<u8>,
    /// Optional sender signature over the ciphertext, for authenticated memos.
    pub signature: Option<Signature>,
}

/// A transaction memo: either plaintext or an encrypted envelope.
/// Detection between the two is purely structural (tagged enum), matching
/// spec's "detection is by envelope schema".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Memo {
    Plaintext(String),
    Encrypted(EncryptedMemo),
}

/// Pedersen commitment + range proof bundle for a confidential transfer.
/// The validator checks the proof without learning `amount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidentialData {
    /// Compressed Pedersen commitment to the transfer amount.
    pub amount_commitment: Vec<u8>,
    /// Compressed Pedersen commitment to the fee.
    pub fee_commitment: Vec<u8>,
    /// Bit-decomposition range proof bounding `amount_commitment` to
    /// `[0, 2^64)`.
    pub range_proof: Vec<u8>,
}

/// A transaction. `id` is the canonical hash of the body excluding
/// `id`/`signature`/`status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Hash,
    pub sender: Address,
    pub recipient: Address,
    /// Fixed-point amount, 8 decimal places, expressed in base units
    /// (see `shared-types::FixedPoint`). Absent for confidential transfers,
    /// where the amount is hidden in `confidential_data`.
    pub amount: Option<FixedPoint>,
    pub fee: FixedPoint,
    pub timestamp: u64,
    /// Absent only for coinbase-style mint transactions.
    pub signature: Option<Signature>,
    pub memo: Option<Memo>,
    pub confidential_data: Option<ConfidentialData>,
    pub status: TransactionStatus,
}

impl Transaction {
    #[must_use]
    pub fn is_coinbase(&self) -> bool {
        self.sender.is_zero() && self.signature.is_none()
    }
}

/// 8-decimal fixed-point quantity for consensus-critical amounts (balances,
/// fees, minted rewards). Stored as an integer count of base units
/// (1 unit = 10^-8 native tokens) to avoid floating-point non-determinism
/// across validating nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FixedPoint(pub u64);

impl FixedPoint {
    pub const DECIMALS: u32 = 8;
    pub const SCALE: u64 = 100_000_000;
    pub const ZERO: FixedPoint = FixedPoint(0);

    #[must_use]
    pub fn from_base_units(units: u64) -> Self {
        Self(units)
    }

    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    #[must_use]
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }
}

impl fmt::Display for FixedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:08}",
            self.0 / Self::SCALE,
            self.0 % Self::SCALE
        )
    }
}

/// Tag identifying which of the two block variants a header belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BlockType {
    #[serde(rename = "PoRW")]
    PoRW,
    #[serde(rename = "PoRS")]
    PoRS,
}

/// Fields common to both block variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub index: u64,
    pub previous_hash: Hash,
    pub timestamp: u64,
    pub block_hash: Hash,
    pub block_type: BlockType,
}

/// Proof-of-Real-Work proof attached to a PoRW block: the folding parameters
/// hash, score, energy, rmsd, and an optional ZK attestation that the
/// reported score matches the committed structure without revealing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PorwProof {
    pub folding_params_hash: Hash,
    pub score: f64,
    pub energy: f64,
    pub rmsd: f64,
    pub zk_attestation: Option<Vec<u8>>,
}

/// A PoRW block: a single coinbase transaction crediting the producer for a
/// validated protein-folding result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PorwBlock {
    pub header: BlockHeader,
    pub protein_data_ref: Hash,
    pub porw_proof: PorwProof,
    pub minted_amount: FixedPoint,
    pub coinbase: Transaction,
}

/// One signed attestation from a storage quorum member over a challenge
/// round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuorumSignature {
    pub node_id: PublicKey,
    pub signature: Signature,
}

/// Proof-of-Reliable-Storage proof attached to a PoRS block: the quorum
/// signatures collected over a challenge round and the challenge ids they
/// cover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PorsProof {
    pub challenge_ids: Vec<Hash>,
    pub quorum_signatures: Vec<QuorumSignature>,
    /// address -> storage reward funded out of collected fees.
    pub storage_rewards: std::collections::BTreeMap<Address, FixedPoint>,
}

/// A PoRS block: an ordered batch of transactions plus the storage-quorum
/// proof for the challenge round it closes out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PorsBlock {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
    pub pors_proof: PorsProof,
}

/// A block is one of the two variants; both share a single height ordering
/// and may interleave in the chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "block_type")]
pub enum Block {
    #[serde(rename = "PoRW")]
    PoRW(PorwBlock),
    #[serde(rename = "PoRS")]
    PoRS(PorsBlock),
}

impl Block {
    #[must_use]
    pub fn header(&self) -> &BlockHeader {
        match self {
            Block::PoRW(b) => &b.header,
            Block::PoRS(b) => &b.header,
        }
    }

    #[must_use]
    pub fn index(&self) -> u64 {
        self.header().index
    }

    #[must_use]
    pub fn block_hash(&self) -> Hash {
        self.header().block_hash
    }

    #[must_use]
    pub fn previous_hash(&self) -> Hash {
        self.header().previous_hash
    }
}

/// Materialized account balance, part of the state manager's snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountState {
    pub address: Address,
    pub balance: FixedPoint,
}

/// A full state snapshot: balances plus the scalar aggregates tracked
/// alongside them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub balances: std::collections::BTreeMap<Address, FixedPoint>,
    pub total_supply: FixedPoint,
    pub total_fees_collected: FixedPoint,
    pub last_processed_index: u64,
    pub last_processed_hash: Hash,
    /// Root of the sorted-balance Merkle tree over `balances`.
    pub state_root: Hash,
}

/// Stable identifier for a peer, derived from its public key.
pub type PeerId = PublicKey;

/// Liveness/handshake state of a peer connection, per spec's per-peer state
/// machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerState {
    Disconnected,
    Connecting,
    Connected,
    Handshaking,
    Active,
    Disconnecting,
    Banned,
}

/// Everything the P2P layer tracks about a peer: network address,
/// handshake-reported metadata, reputation, and connection state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerInfo {
    pub peer_id: PeerId,
    pub address: String,
    pub state: PeerState,
    pub user_agent: Option<String>,
    pub network_id: Option<String>,
    pub chain_height: Option<u64>,
    /// 0-100 reputation score.
    pub reputation: u8,
    pub banned_until: Option<u64>,
    pub ban_count: u32,
}

impl PeerInfo {
    #[must_use]
    pub fn new(peer_id: PeerId, address: String) -> Self {
        Self {
            peer_id,
            address,
            state: PeerState::Disconnected,
            user_agent: None,
            network_id: None,
            chain_height: None,
            reputation: 100,
            banned_until: None,
            ban_count: 0,
        }
    }
}
