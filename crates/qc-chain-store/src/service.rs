//! The chain store service: wires a [`KeyValueStore`] into the
//! [`ChainStore`] contract, maintaining every secondary index atomically
//! alongside the primary block record.

use crate::domain::errors::StoreError;
use crate::domain::keys;
use crate::ports::inbound::ChainStore;
use crate::ports::outbound::{BatchOperation, KeyValueStore};
use shared_types::{Address, Block, BlockType, Hash, Transaction};
use tracing::instrument;

pub struct ChainStoreService<K: KeyValueStore> {
    kv: K,
}

impl<K: KeyValueStore> ChainStoreService<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    fn tip_index(&self) -> Result<Option<u64>, StoreError> {
        match self.kv.get(keys::TIP_KEY)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    fn transactions_of(block: &Block) -> Vec<&Transaction> {
        match block {
            Block::PoRW(b) => vec![&b.coinbase],
            Block::PoRS(b) => b.transactions.iter().collect(),
        }
    }

    fn read_block_at(&self, index: u64) -> Result<Option<Block>, StoreError> {
        match self.kv.get(&keys::block_by_index(index))? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }
}

impl<K: KeyValueStore> ChainStore for ChainStoreService<K> {
    #[instrument(skip(self, block), fields(index = block.index()))]
    fn append(&self, block: &Block) -> Result<(), StoreError> {
        let tip = self.tip_index()?;
        let expected_index = tip.map_or(0, |t| t + 1);
        if block.index() != expected_index {
            return Err(StoreError::Conflict(format!(
                "expected index {expected_index}, got {}",
                block.index()
            )));
        }

        if self
            .kv
            .get(&keys::index_by_hash(&block.block_hash()))?
            .is_some()
        {
            return Err(StoreError::Conflict(format!(
                "block hash {:x?} already stored",
                block.block_hash()
            )));
        }

        let block_bytes = bincode::serialize(block)?;
        let mut ops = vec![
            BatchOperation::put(keys::block_by_index(block.index()), block_bytes),
            BatchOperation::put(
                keys::index_by_hash(&block.block_hash()),
                bincode::serialize(&block.index())?,
            ),
            BatchOperation::put(
                keys::latest_by_type(block.header().block_type),
                bincode::serialize(&block.index())?,
            ),
            BatchOperation::put(keys::TIP_KEY, bincode::serialize(&block.index())?),
        ];

        for tx in Self::transactions_of(block) {
            ops.push(BatchOperation::put(
                keys::tx_by_id(&tx.id),
                bincode::serialize(tx)?,
            ));
            ops.push(BatchOperation::put(
                keys::addr_index(tx.sender.as_str(), &tx.id),
                Vec::new(),
            ));
            ops.push(BatchOperation::put(
                keys::addr_index(tx.recipient.as_str(), &tx.id),
                Vec::new(),
            ));
        }

        self.kv.atomic_batch_write(ops)?;
        tracing::debug!(index = block.index(), "block appended");
        Ok(())
    }

    fn get_by_index(&self, index: u64) -> Result<Option<Block>, StoreError> {
        self.read_block_at(index)
    }

    fn get_by_hash(&self, hash: &Hash) -> Result<Option<Block>, StoreError> {
        match self.kv.get(&keys::index_by_hash(hash))? {
            Some(bytes) => {
                let index: u64 = bincode::deserialize(&bytes)?;
                self.read_block_at(index)
            }
            None => Ok(None),
        }
    }

    fn latest(&self) -> Result<Option<Block>, StoreError> {
        match self.tip_index()? {
            Some(index) => self.read_block_at(index),
            None => Ok(None),
        }
    }

    fn latest_by_type(
        &self,
        block_type: BlockType,
        before_index: Option<u64>,
    ) -> Result<Option<Block>, StoreError> {
        let Some(bytes) = self.kv.get(&keys::latest_by_type(block_type))? else {
            return Ok(None);
        };
        let mut index: u64 = bincode::deserialize(&bytes)?;

        // Fast path pointer may be ahead of `before_index` after a reorg
        // rewrote history; walk backward through same-type blocks.
        if let Some(before) = before_index {
            loop {
                if index < before {
                    break;
                }
                if index == 0 {
                    return Ok(None);
                }
                index -= 1;
                if let Some(candidate) = self.read_block_at(index)? {
                    if candidate.header().block_type == block_type {
                        return Ok(Some(candidate));
                    }
                }
            }
        }

        self.read_block_at(index)
    }

    fn range(&self, start: u64, end: u64) -> Result<Vec<Block>, StoreError> {
        let mut out = Vec::new();
        for index in start..=end {
            if let Some(block) = self.read_block_at(index)? {
                out.push(block);
            }
        }
        Ok(out)
    }

    fn get_tx(&self, id: &Hash) -> Result<Option<Transaction>, StoreError> {
        match self.kv.get(&keys::tx_by_id(id))? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    fn txs_for_address(
        &self,
        address: &Address,
        since_tx: Option<Hash>,
    ) -> Result<Vec<Transaction>, StoreError> {
        let prefix = keys::addr_index_prefix(address.as_str());
        let mut seen_marker = false;
        let mut out = Vec::new();
        for (key, _) in self.kv.prefix_scan(&prefix)? {
            let tx_id_bytes = &key[prefix.len()..];
            if tx_id_bytes.len() != 32 {
                continue;
            }
            let mut tx_id = [0u8; 32];
            tx_id.copy_from_slice(tx_id_bytes);

            let Some(tx) = self.kv.get(&keys::tx_by_id(&tx_id))? else {
                continue;
            };
            let tx: Transaction = bincode::deserialize(&tx)?;

            if let Some(since) = since_tx {
                if !seen_marker {
                    if tx.id == since {
                        seen_marker = true;
                    }
                    continue;
                }
            }
            out.push(tx);
        }
        Ok(out)
    }

    #[instrument(skip(self))]
    fn truncate_above(&self, index: u64) -> Result<(), StoreError> {
        let Some(tip) = self.tip_index()? else {
            return Ok(());
        };
        if tip <= index {
            return Ok(());
        }

        let mut ops = Vec::new();
        for i in (index + 1..=tip).rev() {
            let Some(block) = self.read_block_at(i)? else {
                continue;
            };
            ops.push(BatchOperation::delete(keys::block_by_index(i)));
            ops.push(BatchOperation::delete(keys::index_by_hash(
                &block.block_hash(),
            )));
            for tx in Self::transactions_of(&block) {
                ops.push(BatchOperation::delete(keys::tx_by_id(&tx.id)));
                ops.push(BatchOperation::delete(keys::addr_index(
                    tx.sender.as_str(),
                    &tx.id,
                )));
                ops.push(BatchOperation::delete(keys::addr_index(
                    tx.recipient.as_str(),
                    &tx.id,
                )));
            }
        }
        ops.push(BatchOperation::put(keys::TIP_KEY, bincode::serialize(&index)?));
        self.kv.atomic_batch_write(ops)?;

        // Recompute the latest-by-type pointers by walking back from the
        // new tip; cheap relative to the truncation itself and keeps the
        // fast-path pointer in `latest_by_type` correct after a reorg.
        for block_type in [BlockType::PoRW, BlockType::PoRS] {
            let mut cursor = index;
            loop {
                match self.read_block_at(cursor)? {
                    Some(b) if b.header().block_type == block_type => {
                        self.kv.atomic_batch_write(vec![BatchOperation::put(
                            keys::latest_by_type(block_type),
                            bincode::serialize(&cursor)?,
                        )])?;
                        break;
                    }
                    _ if cursor == 0 => {
                        self.kv.atomic_batch_write(vec![BatchOperation::delete(
                            keys::latest_by_type(block_type),
                        )])?;
                        break;
                    }
                    _ => cursor -= 1,
                }
            }
        }

        tracing::info!(new_tip = index, "chain truncated for reorg");
        Ok(())
    }
}
