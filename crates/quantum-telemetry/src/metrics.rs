//! Prometheus metrics for the Quantum-Chain node.
//!
//! All metrics follow the naming convention: `qc_<subsystem>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., `blocks_stored_total`)
//! - **Gauge**: Value that can go up or down (e.g., `mempool_size`)
//! - **Histogram**: Distribution of values (e.g., `block_validation_duration_seconds`)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, HistogramVec, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // VALIDATOR METRICS (qc-validator)
    // =========================================================================

    /// Total blocks validated.
    pub static ref BLOCKS_VALIDATED: Counter = Counter::new(
        "qc_validator_blocks_validated_total",
        "Total number of blocks validated"
    ).expect("metric creation failed");

    /// Block validation duration histogram.
    pub static ref BLOCK_VALIDATION_DURATION: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "qc_validator_block_validation_duration_seconds",
            "Time spent validating blocks"
        ).buckets(exponential_buckets(0.001, 2.0, 15).unwrap())
    ).expect("metric creation failed");

    /// Block validation outcomes, split by block type and accept/reject.
    pub static ref BLOCKS_BY_OUTCOME: CounterVec = CounterVec::new(
        Opts::new("qc_validator_blocks_total", "Blocks validated by type and outcome"),
        &["block_type", "outcome"]  // block_type: porw/pors, outcome: accepted/rejected
    ).expect("metric creation failed");

    // =========================================================================
    // CHAIN STORE METRICS (qc-chain-store)
    // =========================================================================

    /// Total blocks stored.
    pub static ref BLOCKS_STORED: Counter = Counter::new(
        "qc_chain_store_blocks_stored_total",
        "Total number of blocks written to storage"
    ).expect("metric creation failed");

    /// Current chain height.
    pub static ref CHAIN_HEIGHT: Gauge = Gauge::new(
        "qc_chain_store_height",
        "Current blockchain height"
    ).expect("metric creation failed");

    /// Block storage duration.
    pub static ref BLOCK_STORAGE_DURATION: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "qc_chain_store_block_write_duration_seconds",
            "Time spent writing blocks to storage"
        ).buckets(exponential_buckets(0.0001, 2.0, 12).unwrap())
    ).expect("metric creation failed");

    /// Total reorgs performed, labeled by depth bucket.
    pub static ref REORGS: CounterVec = CounterVec::new(
        Opts::new("qc_chain_store_reorgs_total", "Chain reorganizations performed"),
        &["depth_bucket"]  // shallow (1-2) / moderate (3-10) / deep (10+)
    ).expect("metric creation failed");

    // =========================================================================
    // CONSENSUS DRIVER METRICS (qc-consensus)
    // =========================================================================

    /// Checkpoints committed.
    pub static ref CHECKPOINTS_COMMITTED: Counter = Counter::new(
        "qc_consensus_checkpoints_committed_total",
        "Total number of reorg-barrier checkpoints committed"
    ).expect("metric creation failed");

    // =========================================================================
    // PoRW ENGINE METRICS (qc-porw)
    // =========================================================================

    /// Total PoRW blocks minted.
    pub static ref PORW_BLOCKS_MINTED: Counter = Counter::new(
        "qc_porw_blocks_minted_total",
        "Total number of PoRW blocks minted"
    ).expect("metric creation failed");

    /// Total amount minted across all PoRW blocks, in base units.
    pub static ref PORW_AMOUNT_MINTED: Counter = Counter::new(
        "qc_porw_amount_minted_base_units_total",
        "Total minted reward amount, in 1e-8 base units"
    ).expect("metric creation failed");

    /// Folding score distribution of accepted proofs.
    pub static ref PORW_SCORE: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "qc_porw_proof_score",
            "Folding score of accepted PoRW proofs"
        ).buckets(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0])
    ).expect("metric creation failed");

    // =========================================================================
    // PoRS ENGINE METRICS (qc-pors)
    // =========================================================================

    /// Storage challenges issued.
    pub static ref PORS_CHALLENGES_ISSUED: Counter = Counter::new(
        "qc_pors_challenges_issued_total",
        "Total storage challenges issued"
    ).expect("metric creation failed");

    /// Storage challenge responses, by outcome.
    pub static ref PORS_CHALLENGE_RESPONSES: CounterVec = CounterVec::new(
        Opts::new("qc_pors_challenge_responses_total", "Storage challenge responses by outcome"),
        &["outcome"]  // outcome: accepted/rejected/timeout
    ).expect("metric creation failed");

    /// Chunks currently below `min_replication`.
    pub static ref PORS_UNDER_REPLICATED_CHUNKS: Gauge = Gauge::new(
        "qc_pors_under_replicated_chunks",
        "Number of chunks currently below the minimum replication factor"
    ).expect("metric creation failed");

    // =========================================================================
    // TRANSACTION / MEMPOOL METRICS (qc-mempool)
    // =========================================================================

    /// Total transactions received.
    pub static ref TRANSACTIONS_RECEIVED: Counter = Counter::new(
        "qc_mempool_transactions_received_total",
        "Total transactions received into mempool"
    ).expect("metric creation failed");

    /// Total transactions admitted after validation.
    pub static ref TRANSACTIONS_ADMITTED: Counter = Counter::new(
        "qc_mempool_transactions_admitted_total",
        "Total transactions admitted to mempool after validation"
    ).expect("metric creation failed");

    /// Current mempool size (transaction count).
    pub static ref MEMPOOL_SIZE: Gauge = Gauge::new(
        "qc_mempool_transactions_pending",
        "Number of pending transactions in mempool"
    ).expect("metric creation failed");

    /// Current mempool size (bytes).
    pub static ref MEMPOOL_BYTES: Gauge = Gauge::new(
        "qc_mempool_size_bytes",
        "Total size of pending transactions in bytes"
    ).expect("metric creation failed");

    // =========================================================================
    // PEER METRICS (qc-p2p)
    // =========================================================================

    /// Connected peers.
    pub static ref PEERS_CONNECTED: Gauge = Gauge::new(
        "qc_p2p_peers_connected",
        "Number of currently ACTIVE peers"
    ).expect("metric creation failed");

    /// Total peers discovered.
    pub static ref PEERS_DISCOVERED: Counter = Counter::new(
        "qc_p2p_peers_discovered_total",
        "Total number of peers discovered"
    ).expect("metric creation failed");

    /// Peer connection attempts.
    pub static ref PEER_CONNECTIONS: CounterVec = CounterVec::new(
        Opts::new("qc_p2p_connection_attempts_total", "Peer connection attempts"),
        &["outcome"]  // outcome: success/failed/timeout
    ).expect("metric creation failed");

    /// Peer bans issued.
    pub static ref PEER_BANS: Counter = Counter::new(
        "qc_p2p_peer_bans_total",
        "Total number of peer bans issued"
    ).expect("metric creation failed");

    // =========================================================================
    // SIGNATURE METRICS (qc-validator)
    // =========================================================================

    /// Total signature verifications.
    pub static ref SIGNATURE_VERIFICATIONS: CounterVec = CounterVec::new(
        Opts::new("qc_validator_signature_verifications_total", "Total signature verifications"),
        &["result"]  // result: valid/invalid
    ).expect("metric creation failed");

    /// Signature verification duration.
    pub static ref SIGNATURE_DURATION: HistogramVec = HistogramVec::new(
        prometheus::HistogramOpts::new(
            "qc_validator_signature_verification_duration_seconds",
            "Time spent verifying signatures"
        ).buckets(exponential_buckets(0.00001, 2.0, 15).unwrap()),
        &["context"]  // context: transaction/proof_attestation
    ).expect("metric creation failed");

    // =========================================================================
    // EVENT BUS METRICS
    // =========================================================================

    /// Messages published via the event bus.
    pub static ref EVENT_BUS_MESSAGES_PUBLISHED: CounterVec = CounterVec::new(
        Opts::new("qc_eventbus_messages_published_total", "Messages published via event bus"),
        &["event_type", "source_subsystem"]
    ).expect("metric creation failed");

    /// Event bus delivery latency.
    pub static ref EVENT_BUS_LATENCY: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "qc_eventbus_delivery_latency_seconds",
            "Time for event delivery via bus"
        ).buckets(exponential_buckets(0.0001, 2.0, 12).unwrap())
    ).expect("metric creation failed");

    // =========================================================================
    // ERROR METRICS
    // =========================================================================

    /// Subsystem errors by type.
    pub static ref SUBSYSTEM_ERRORS: CounterVec = CounterVec::new(
        Opts::new("qc_subsystem_errors_total", "Errors by subsystem and kind"),
        &["subsystem", "error_kind"]
    ).expect("metric creation failed");
}

/// Handle for the metrics server.
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Validator
        Box::new(BLOCKS_VALIDATED.clone()),
        Box::new(BLOCK_VALIDATION_DURATION.clone()),
        Box::new(BLOCKS_BY_OUTCOME.clone()),
        Box::new(SIGNATURE_VERIFICATIONS.clone()),
        Box::new(SIGNATURE_DURATION.clone()),
        // Chain store
        Box::new(BLOCKS_STORED.clone()),
        Box::new(CHAIN_HEIGHT.clone()),
        Box::new(BLOCK_STORAGE_DURATION.clone()),
        Box::new(REORGS.clone()),
        // Consensus
        Box::new(CHECKPOINTS_COMMITTED.clone()),
        // PoRW
        Box::new(PORW_BLOCKS_MINTED.clone()),
        Box::new(PORW_AMOUNT_MINTED.clone()),
        Box::new(PORW_SCORE.clone()),
        // PoRS
        Box::new(PORS_CHALLENGES_ISSUED.clone()),
        Box::new(PORS_CHALLENGE_RESPONSES.clone()),
        Box::new(PORS_UNDER_REPLICATED_CHUNKS.clone()),
        // Mempool
        Box::new(TRANSACTIONS_RECEIVED.clone()),
        Box::new(TRANSACTIONS_ADMITTED.clone()),
        Box::new(MEMPOOL_SIZE.clone()),
        Box::new(MEMPOOL_BYTES.clone()),
        // Peers
        Box::new(PEERS_CONNECTED.clone()),
        Box::new(PEERS_DISCOVERED.clone()),
        Box::new(PEER_CONNECTIONS.clone()),
        Box::new(PEER_BANS.clone()),
        // Event bus
        Box::new(EVENT_BUS_MESSAGES_PUBLISHED.clone()),
        Box::new(EVENT_BUS_LATENCY.clone()),
        // Errors
        Box::new(SUBSYSTEM_ERRORS.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics() {
        // May fail if already registered (other tests ran first), which is fine.
        let result = register_metrics();
        let _ = result;
    }

    #[test]
    fn test_counter_increment() {
        PORW_BLOCKS_MINTED.inc();
        assert!(PORW_BLOCKS_MINTED.get() >= 1.0);
    }

    #[test]
    fn test_gauge_set() {
        MEMPOOL_SIZE.set(42.0);
        assert_eq!(MEMPOOL_SIZE.get(), 42.0);
    }

    #[test]
    fn test_histogram_timer() {
        let _timer = HistogramTimer::new(&BLOCK_VALIDATION_DURATION);
        std::thread::sleep(std::time::Duration::from_millis(1));
    }
}
