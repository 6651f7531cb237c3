//! The mempool service: wires the [`TransactionPool`] indices into the
//! [`Mempool`] contract behind a single `RwLock`, updating the pre-registered
//! mempool gauges on every admission/removal.

use std::sync::RwLock;

use quantum_telemetry::{MEMPOOL_BYTES, MEMPOOL_SIZE, TRANSACTIONS_ADMITTED, TRANSACTIONS_RECEIVED};
use shared_types::{Address, Block, FixedPoint, Hash, Transaction};
use tracing::instrument;

use crate::domain::errors::MempoolError;
use crate::domain::pool::TransactionPool;
use crate::ports::inbound::Mempool;

pub struct MempoolService {
    pool: RwLock<TransactionPool>,
}

impl MempoolService {
    pub fn new(max_count: usize, max_bytes: usize) -> Self {
        Self { pool: RwLock::new(TransactionPool::new(max_count, max_bytes)) }
    }

    fn transactions_of(block: &Block) -> Vec<&Transaction> {
        match block {
            Block::PoRW(b) => vec![&b.coinbase],
            Block::PoRS(b) => b.transactions.iter().collect(),
        }
    }

    fn publish_gauges(pool: &TransactionPool) {
        MEMPOOL_SIZE.set(pool.len() as f64);
        MEMPOOL_BYTES.set(pool.total_bytes() as f64);
    }
}

impl Mempool for MempoolService {
    #[instrument(skip(self, tx), fields(id = ?tx.id))]
    fn insert(&self, tx: Transaction) -> Result<(), MempoolError> {
        TRANSACTIONS_RECEIVED.inc();
        let mut pool = self.pool.write().expect("mempool lock poisoned");
        let result = pool.insert(tx);
        if result.is_ok() {
            TRANSACTIONS_ADMITTED.inc();
        }
        Self::publish_gauges(&pool);
        result
    }

    fn remove(&self, id: &Hash) -> Option<Transaction> {
        let mut pool = self.pool.write().expect("mempool lock poisoned");
        let removed = pool.remove(id);
        Self::publish_gauges(&pool);
        removed
    }

    #[instrument(skip(self, block), fields(index = block.index()))]
    fn remove_included(&self, block: &Block) {
        let mut pool = self.pool.write().expect("mempool lock poisoned");
        for tx in Self::transactions_of(block) {
            pool.remove(&tx.id);
        }
        Self::publish_gauges(&pool);
        tracing::debug!(index = block.index(), "mempool pruned for included block");
    }

    fn candidates_from_reverted(&self, block: &Block) -> Vec<Transaction> {
        Self::transactions_of(block)
            .into_iter()
            .filter(|tx| !tx.is_coinbase())
            .cloned()
            .collect()
    }

    fn by_fee(&self, min_fee: Option<FixedPoint>, limit: usize) -> Vec<Transaction> {
        self.pool.read().expect("mempool lock poisoned").by_fee(min_fee, limit)
    }

    fn for_address(&self, address: &Address) -> Vec<Transaction> {
        self.pool.read().expect("mempool lock poisoned").for_address(address)
    }

    fn contains(&self, id: &Hash) -> bool {
        self.pool.read().expect("mempool lock poisoned").contains(id)
    }

    fn len(&self) -> usize {
        self.pool.read().expect("mempool lock poisoned").len()
    }
}
