//! The consensus driver service: composes `qc-validator`, `qc-chain-store`,
//! `qc-state`, and `qc-mempool` behind the validate/apply/reorg flow of
//! spec.md §4.10.
//!
//! Fork handling works by following `previous_hash` pointers rather than
//! storing competing branches in the chain store itself (which only ever
//! holds one linear history): a block that doesn't extend the tip is
//! buffered in an in-memory orphan pool keyed by its own hash, and every
//! new arrival re-attempts to trace a path from itself back through the
//! orphan pool to a hash the chain store already recognizes. Once that
//! path resolves, its cumulative work is compared against the
//! corresponding segment of the current chain.

use std::collections::HashMap;
use std::sync::Mutex;

use qc_chain_store::ChainStore;
use qc_mempool::Mempool;
use qc_state::StateManager;
use qc_validator::Validator;
use shared_types::{Block, ConsensusParams, Hash};
use tracing::instrument;

use crate::domain::cadence::pors_due;
use crate::domain::checkpoint::{latest_checkpoint_index, reorg_allowed, reorg_depth, within_max_depth};
use crate::domain::errors::ConsensusError;
use crate::domain::fork_choice::{cumulative_work, candidate_wins};
use crate::domain::outcome::BlockOutcome;
use crate::ports::inbound::ConsensusDriver;

/// Orphan pool entries older than this (by insertion count, not wall
/// clock) are evicted to bound memory under gossip spam; a legitimate
/// fork is never this deep in practice since `max_reorg_depth` rejects it
/// anyway once resolved.
const MAX_ORPHAN_POOL: usize = 4_096;

struct OrphanPool {
    by_hash: HashMap<Hash, Block>,
    insertion_order: std::collections::VecDeque<Hash>,
}

impl OrphanPool {
    fn new() -> Self {
        Self { by_hash: HashMap::new(), insertion_order: std::collections::VecDeque::new() }
    }

    fn insert(&mut self, block: Block) {
        let hash = block.block_hash();
        if self.by_hash.contains_key(&hash) {
            return;
        }
        if self.insertion_order.len() >= MAX_ORPHAN_POOL {
            if let Some(oldest) = self.insertion_order.pop_front() {
                self.by_hash.remove(&oldest);
            }
        }
        self.insertion_order.push_back(hash);
        self.by_hash.insert(hash, block);
    }

    fn remove_many(&mut self, hashes: &[Hash]) {
        for hash in hashes {
            self.by_hash.remove(hash);
        }
        self.insertion_order.retain(|h| !hashes.contains(h));
    }
}

pub struct ConsensusDriverService<C, S, M, V> {
    chain_store: C,
    state: S,
    mempool: M,
    validator: V,
    params: ConsensusParams,
    orphans: Mutex<OrphanPool>,
}

impl<C, S, M, V> ConsensusDriverService<C, S, M, V>
where
    C: ChainStore,
    S: StateManager,
    M: Mempool,
    V: Validator,
{
    pub fn new(chain_store: C, state: S, mempool: M, validator: V, params: ConsensusParams) -> Self {
        Self { chain_store, state, mempool, validator, params, orphans: Mutex::new(OrphanPool::new()) }
    }

    fn extends_tip(block: &Block, tip: Option<&Block>) -> bool {
        match tip {
            Some(t) => block.previous_hash() == t.block_hash(),
            None => block.previous_hash() == [0u8; 32] && block.index() == 0,
        }
    }

    /// Apply a single block that is known to extend the current tip:
    /// validate, append, apply state, drop its transactions from the
    /// mempool.
    fn extend(&self, block: &Block) -> Result<(), ConsensusError> {
        self.validator.validate_block(block)?;
        self.chain_store.append(block)?;
        self.state.apply(block)?;
        self.mempool.remove_included(block);
        Ok(())
    }

    /// Trace `block` backward through the orphan pool to a hash the
    /// chain store already recognizes, returning the ancestor's index and
    /// the candidate branch ordered from just-after-the-ancestor to
    /// `block` itself. `None` if the chain does not (yet) resolve.
    fn resolve_branch(&self, block: Block, orphans: &OrphanPool) -> Result<Option<(u64, Vec<Block>)>, ConsensusError> {
        // Bounds the backward walk so a peer cannot wedge two fabricated
        // blocks into a cycle of mutually-referencing previous_hash
        // fields and spin this loop forever; any legitimate branch within
        // policy is shorter than this by construction (max_reorg_depth is
        // checked again once a fork point is actually found).
        let walk_limit = self.params.max_reorg_depth as usize + MAX_ORPHAN_POOL;
        let mut branch = vec![block];
        loop {
            if branch.len() > walk_limit {
                return Ok(None);
            }
            let current = branch.last().expect("branch always has at least one block");
            let parent_hash = current.previous_hash();

            if let Some(ancestor) = self.chain_store.get_by_hash(&parent_hash)? {
                branch.reverse();
                return Ok(Some((ancestor.index(), branch)));
            }
            if parent_hash == [0u8; 32] && current.index() == 0 {
                branch.reverse();
                return Ok(Some((0u64.wrapping_sub(1), branch))); // sentinel: no ancestor, branch replaces whole chain from genesis
            }
            match orphans.by_hash.get(&parent_hash) {
                Some(parent) => branch.push(parent.clone()),
                None => return Ok(None),
            }
        }
    }

    /// Swap the canonical chain from `old_branch` to `new_branch`, both
    /// ordered oldest-first starting just after `fork_point_index`.
    /// Rolls back to the prior chain on any failure partway through the
    /// new branch.
    fn reorg_to(
        &self,
        fork_point_index: u64,
        old_branch: Vec<Block>,
        new_branch: Vec<Block>,
    ) -> Result<BlockOutcome, ConsensusError> {
        for block in old_branch.iter().rev() {
            self.state.revert(block)?;
        }
        self.chain_store.truncate_above(fork_point_index)?;

        let mut applied = Vec::with_capacity(new_branch.len());
        for block in &new_branch {
            if let Err(err) = self.extend(block) {
                // Roll back the partial new branch and restore the old one.
                self.chain_store.truncate_above(fork_point_index).ok();
                for old_block in &old_branch {
                    self.state.apply(old_block).ok();
                    self.chain_store.append(old_block).ok();
                }
                return Err(err);
            }
            applied.push(block.block_hash());
        }

        for old_block in &old_branch {
            for tx in self.mempool.candidates_from_reverted(old_block) {
                if self.validator.validate_transaction(&tx).is_ok() {
                    let _ = self.mempool.insert(tx);
                }
            }
        }

        let new_tip = new_branch.last().expect("reorg always carries at least one new block");
        Ok(BlockOutcome::Reorganized {
            fork_point_index,
            new_tip_index: new_tip.index(),
            new_tip_hash: new_tip.block_hash(),
            reverted: old_branch.iter().map(Block::block_hash).collect(),
            applied,
        })
    }
}

impl<C, S, M, V> ConsensusDriver for ConsensusDriverService<C, S, M, V>
where
    C: ChainStore,
    S: StateManager,
    M: Mempool,
    V: Validator,
{
    #[instrument(skip(self, block), fields(index = block.index()))]
    fn on_block_received(&self, block: Block) -> Result<BlockOutcome, ConsensusError> {
        if self.chain_store.get_by_hash(&block.block_hash())?.is_some() {
            return Ok(BlockOutcome::Duplicate);
        }

        let tip = self.chain_store.latest()?;

        if Self::extends_tip(&block, tip.as_ref()) {
            let index = block.index();
            let hash = block.block_hash();
            self.extend(&block)?;
            return Ok(BlockOutcome::Extended { index, hash });
        }

        let mut orphans = self.orphans.lock().expect("orphan pool mutex poisoned");
        let new_hash = block.block_hash();
        let resolved = self.resolve_branch(block.clone(), &orphans)?;

        let Some((fork_point_index, candidate_branch)) = resolved else {
            orphans.insert(block);
            return Ok(BlockOutcome::BufferedAsOrphan);
        };

        let tip_index = tip.as_ref().map_or(0, |t| t.index());
        // The genesis-replacement sentinel never competes with an
        // established chain; a populated chain store always has a real
        // ancestor to resolve against.
        if tip.is_some() && fork_point_index == u64::MAX {
            orphans.insert(block);
            return Err(ConsensusError::UnknownForkPoint);
        }
        let effective_fork_index = if tip.is_none() { 0 } else { fork_point_index };

        let checkpoint_index = latest_checkpoint_index(tip_index, self.params.checkpoint_interval);
        if !reorg_allowed(effective_fork_index, checkpoint_index) {
            orphans.insert(block);
            return Err(ConsensusError::ReorgBelowCheckpoint {
                fork_point_index: effective_fork_index,
                checkpoint_index,
            });
        }
        let depth = reorg_depth(tip_index, effective_fork_index);
        if !within_max_depth(depth, self.params.max_reorg_depth) {
            orphans.insert(block);
            return Err(ConsensusError::ReorgTooDeep { depth, max_depth: self.params.max_reorg_depth });
        }

        let old_branch = self.chain_store.range(effective_fork_index + 1, tip_index)?;
        let alpha = self.params.fork_choice_alpha;
        let candidate_work = cumulative_work(candidate_branch.iter(), alpha);
        let current_work = cumulative_work(old_branch.iter(), alpha);

        if !candidate_wins(candidate_work, current_work) {
            orphans.insert(block);
            return Ok(BlockOutcome::BufferedAsOrphan);
        }

        let consumed: Vec<Hash> = candidate_branch.iter().map(Block::block_hash).collect();
        let outcome = self.reorg_to(effective_fork_index, old_branch, candidate_branch)?;
        orphans.remove_many(&consumed);
        orphans.by_hash.remove(&new_hash);
        Ok(outcome)
    }

    fn last_checkpoint_index(&self) -> u64 {
        let tip_index = self.chain_store.latest().ok().flatten().map_or(0, |b| b.index());
        latest_checkpoint_index(tip_index, self.params.checkpoint_interval)
    }

    fn pors_production_due(&self, now: u64) -> Result<bool, ConsensusError> {
        let last_pors_timestamp = match self.chain_store.latest_by_type(shared_types::BlockType::PoRS, None)? {
            Some(block) => block.header().timestamp,
            None => return Ok(true),
        };
        Ok(pors_due(last_pors_timestamp, now, self.params.pors_block_interval_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qc_chain_store::{ChainStoreService, InMemoryKVStore};
    use qc_mempool::MempoolService;
    use qc_state::StateService;
    use qc_validator::ValidatorService;
    use shared_types::{Address, BlockHeader, BlockType, ConfidentialData, FixedPoint, PorsBlock, PorsProof, PorwBlock, PorwProof, TransactionStatus, ZERO_ADDRESS};

    struct FixedBalance(u64);
    impl qc_validator::ports::outbound::BalanceSource for FixedBalance {
        fn balance(&self, _address: &Address) -> FixedPoint {
            FixedPoint(self.0)
        }
    }
    struct RejectConfidential;
    impl qc_validator::ports::outbound::ConfidentialProofVerifier for RejectConfidential {
        fn verify(&self, _data: &ConfidentialData) -> bool {
            false
        }
    }
    struct LiveSupply<'a, S>(&'a S);
    impl<'a, S: StateManager> qc_validator::ports::outbound::TotalSupplySource for LiveSupply<'a, S> {
        fn total_supply(&self) -> FixedPoint {
            self.0.snapshot().total_supply
        }
    }

    fn coinbase(recipient: Address, amount: u64, timestamp: u64) -> shared_types::Transaction {
        let mut tx = shared_types::Transaction {
            id: [0u8; 32],
            sender: Address::new_unchecked(ZERO_ADDRESS.to_string()),
            recipient,
            amount: Some(FixedPoint(amount)),
            fee: FixedPoint::ZERO,
            timestamp,
            signature: None,
            memo: None,
            confidential_data: None,
            status: TransactionStatus::Confirmed,
        };
        tx.id = shared_crypto::canonical::canonical_hash(&(
            tx.sender.as_str(),
            tx.recipient.as_str(),
            tx.amount,
            tx.fee,
            tx.timestamp,
        ))
        .unwrap();
        tx
    }

    fn genesis_porw(recipient: Address) -> Block {
        Block::PoRW(PorwBlock {
            header: BlockHeader { index: 0, previous_hash: [0u8; 32], timestamp: 0, block_hash: [0u8; 32], block_type: BlockType::PoRW },
            protein_data_ref: [1u8; 32],
            porw_proof: PorwProof { folding_params_hash: [2u8; 32], score: 0.9, energy: -1.0, rmsd: 0.1, zk_attestation: None },
            minted_amount: FixedPoint(0),
            coinbase: coinbase(recipient, 0, 0),
        })
    }

    #[test]
    fn duplicate_block_is_reported_as_duplicate_not_reprocessed() {
        let chain_store = ChainStoreService::new(InMemoryKVStore::new());
        let state = StateService::new();
        let mempool = MempoolService::new(10, 1_000_000);
        let recipient = Address::new_unchecked("recipient".to_string());
        let validator = ValidatorService::new(
            ChainStoreService::new(InMemoryKVStore::new()),
            FixedBalance(0),
            RejectConfidential,
            LiveSupply(&state),
            ConsensusParams::default(),
        );
        let driver = ConsensusDriverService::new(chain_store, state, mempool, validator, ConsensusParams::default());

        let genesis = genesis_porw(recipient);
        let first = driver.on_block_received(genesis.clone()).unwrap();
        assert!(matches!(first, BlockOutcome::Extended { index: 0, .. }));

        let second = driver.on_block_received(genesis).unwrap();
        assert_eq!(second, BlockOutcome::Duplicate);
    }

    #[test]
    fn block_with_unresolvable_parent_is_buffered_as_orphan() {
        let chain_store = ChainStoreService::new(InMemoryKVStore::new());
        let state = StateService::new();
        let mempool = MempoolService::new(10, 1_000_000);
        let validator = ValidatorService::new(
            ChainStoreService::new(InMemoryKVStore::new()),
            FixedBalance(0),
            RejectConfidential,
            LiveSupply(&state),
            ConsensusParams::default(),
        );
        let driver = ConsensusDriverService::new(chain_store, state, mempool, validator, ConsensusParams::default());

        let orphan = Block::PoRS(PorsBlock {
            header: BlockHeader { index: 5, previous_hash: [9u8; 32], timestamp: 10, block_hash: [8u8; 32], block_type: BlockType::PoRS },
            transactions: vec![],
            pors_proof: PorsProof { challenge_ids: vec![], quorum_signatures: vec![], storage_rewards: Default::default() },
        });

        let outcome = driver.on_block_received(orphan).unwrap();
        assert_eq!(outcome, BlockOutcome::BufferedAsOrphan);
    }

    #[test]
    fn pors_production_due_before_any_pors_block_exists() {
        let chain_store = ChainStoreService::new(InMemoryKVStore::new());
        let state = StateService::new();
        let mempool = MempoolService::new(10, 1_000_000);
        let validator = ValidatorService::new(
            ChainStoreService::new(InMemoryKVStore::new()),
            FixedBalance(0),
            RejectConfidential,
            LiveSupply(&state),
            ConsensusParams::default(),
        );
        let driver = ConsensusDriverService::new(chain_store, state, mempool, validator, ConsensusParams::default());
        assert!(driver.pors_production_due(1_000).unwrap());
    }
}
