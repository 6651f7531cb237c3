//! # Blockchain Events
//!
//! Defines every event type that flows through the shared bus. These are
//! the choreography events that drive block and transaction processing:
//! each subsystem reacts to an event by doing its part of the work, then
//! publishes the next event in the chain rather than calling the next
//! subsystem directly.

use serde::{Deserialize, Serialize};
use shared_types::entities::{Block, Hash, PeerId, PeerInfo, Transaction};

/// All events that can be published to the event bus.
///
/// The V2.3 choreography pattern: subsystems react to events rather than
/// calling each other directly, so a block's journey from production to
/// storage is a chain of published events, not a call stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BlockchainEvent {
    // =========================================================================
    // P2P (qc-p2p)
    // =========================================================================
    /// A new peer was discovered and verified.
    PeerDiscovered(PeerInfo),

    /// A peer disconnected or was evicted.
    PeerDisconnected(PeerId),

    /// A peer crossed a reputation threshold and was banned.
    PeerBanned {
        peer_id: PeerId,
        until: u64,
        reason: String,
    },

    // =========================================================================
    // MEMPOOL (qc-mempool) / VALIDATOR (qc-validator)
    // =========================================================================
    /// A transaction was received (via P2P gossip or local submission) and is
    /// awaiting validation before mempool admission.
    TransactionReceived(Transaction),

    /// A transaction passed validation and was admitted to the mempool.
    TransactionValidated(Transaction),

    /// A transaction failed validation.
    TransactionRejected { id: Hash, reason: String },

    // =========================================================================
    // PoRW ENGINE (qc-porw) / PoRS ENGINE (qc-pors) — BLOCK PRODUCTION
    // =========================================================================
    /// A new block was produced locally (a validated folding result for
    /// PoRW, or a cadence-scheduled batch for PoRS) and is ready for
    /// validation.
    /// **CHOREOGRAPHY:** triggers the validator (C6).
    BlockProduced(Block),

    // =========================================================================
    // VALIDATOR (qc-validator) — Choreography Trigger
    // =========================================================================
    /// A block passed validation.
    /// **CHOREOGRAPHY:** the primary trigger that starts parallel state
    /// application (C4) and chain-store assembly (C3).
    BlockValidated(Block),

    /// A block failed validation.
    BlockRejected { hash: Hash, reason: String },

    // =========================================================================
    // STATE MANAGER (qc-state) — Choreography Response
    // =========================================================================
    /// The state manager applied a validated block and computed its
    /// resulting state root.
    /// **CHOREOGRAPHY:** consumed by the chain store for block assembly.
    StateApplied { block_hash: Hash, state_root: Hash },

    /// The state manager reverted state during a reorg, down to and
    /// including `fork_point_index`.
    StateReverted { fork_point_index: u64 },

    // =========================================================================
    // CHAIN STORE (qc-chain-store) — Choreography Completion
    // =========================================================================
    /// A block was fully assembled and durably stored.
    /// **CHOREOGRAPHY:** signals completion of the block's processing flow;
    /// triggers gossip relay (C9).
    BlockStored { block_height: u64, block_hash: Hash },

    /// A reorg was performed: blocks above `fork_point_index` on the old
    /// branch were reverted and the winning branch was applied up to
    /// `new_tip_hash`.
    ReorgApplied {
        fork_point_index: u64,
        new_tip_hash: Hash,
        new_tip_index: u64,
    },

    /// Genesis block was initialized and stored.
    /// **CHOREOGRAPHY:** a bootstrap event; subsystems use it to initialize
    /// their own genesis-derived state.
    GenesisInitialized {
        block_hash: Hash,
        height: u64,
        timestamp: u64,
    },

    // =========================================================================
    // CONSENSUS DRIVER (qc-consensus)
    // =========================================================================
    /// Every `K` blocks, the consensus driver committed a reorg barrier:
    /// blocks at or below this index can no longer be reverted.
    CheckpointCommitted { block_index: u64, block_hash: Hash },

    // =========================================================================
    // PoRS ENGINE (qc-pors) — Storage Challenge Protocol
    // =========================================================================
    /// A storage challenge round was issued to a set of nodes.
    ChallengeIssued {
        challenge_id: Hash,
        chunk_id: Hash,
        target_peer: PeerId,
    },

    /// A node responded to a storage challenge; `accepted` reflects whether
    /// the response verified.
    ChallengeResponded {
        challenge_id: Hash,
        peer_id: PeerId,
        accepted: bool,
    },

    /// A node's reliability score dropped below `min_replication` coverage
    /// and re-replication was scheduled.
    ReplicationScheduled { chunk_id: Hash, reason: String },

    // =========================================================================
    // CRITICAL EVENTS (DLQ)
    // =========================================================================
    /// Critical error requiring operator attention; per spec, a `StoreIO`
    /// failure puts the node into safe-mode (stop accepting blocks, keep
    /// serving reads) rather than panicking.
    CriticalError { subsystem_id: u8, error: String },
}

impl BlockchainEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::PeerDiscovered(_) | Self::PeerDisconnected(_) | Self::PeerBanned { .. } => {
                EventTopic::P2p
            }
            Self::TransactionReceived(_)
            | Self::TransactionValidated(_)
            | Self::TransactionRejected { .. } => EventTopic::Mempool,
            Self::BlockProduced(_) => EventTopic::BlockProduction,
            Self::BlockValidated(_) | Self::BlockRejected { .. } => EventTopic::Validator,
            Self::StateApplied { .. } | Self::StateReverted { .. } => EventTopic::StateManagement,
            Self::BlockStored { .. }
            | Self::ReorgApplied { .. }
            | Self::GenesisInitialized { .. } => EventTopic::ChainStore,
            Self::CheckpointCommitted { .. } => EventTopic::Consensus,
            Self::ChallengeIssued { .. }
            | Self::ChallengeResponded { .. }
            | Self::ReplicationScheduled { .. } => EventTopic::Pors,
            Self::CriticalError { .. } => EventTopic::DeadLetterQueue,
        }
    }

    /// Get the originating subsystem id.
    #[must_use]
    pub fn source_subsystem(&self) -> u8 {
        match self {
            Self::PeerDiscovered(_) | Self::PeerDisconnected(_) | Self::PeerBanned { .. } => 1,
            Self::BlockStored { .. }
            | Self::ReorgApplied { .. }
            | Self::GenesisInitialized { .. } => 2,
            Self::StateApplied { .. } | Self::StateReverted { .. } => 3,
            Self::TransactionReceived(_)
            | Self::TransactionValidated(_)
            | Self::TransactionRejected { .. } => 4,
            Self::BlockValidated(_) | Self::BlockRejected { .. } => 5,
            Self::BlockProduced(_) => 6,
            Self::ChallengeIssued { .. }
            | Self::ChallengeResponded { .. }
            | Self::ReplicationScheduled { .. } => 7,
            Self::CheckpointCommitted { .. } => 8,
            Self::CriticalError { subsystem_id, .. } => *subsystem_id,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// qc-p2p events.
    P2p,
    /// qc-chain-store events.
    ChainStore,
    /// qc-state events.
    StateManagement,
    /// qc-mempool events.
    Mempool,
    /// qc-validator events.
    Validator,
    /// qc-porw / qc-pors block production events.
    BlockProduction,
    /// qc-consensus events.
    Consensus,
    /// qc-pors storage challenge events.
    Pors,
    /// Dead Letter Queue for critical errors.
    DeadLetterQueue,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Source subsystems to include. Empty means all sources.
    pub source_subsystems: Vec<u8>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            source_subsystems: Vec::new(),
        }
    }

    /// Create a filter for events from specific subsystems.
    #[must_use]
    pub fn from_subsystems(subsystems: Vec<u8>) -> Self {
        Self {
            topics: Vec::new(),
            source_subsystems: subsystems,
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &BlockchainEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let source_match = self.source_subsystems.is_empty()
            || self.source_subsystems.contains(&event.source_subsystem());

        topic_match && source_match
    }
}
