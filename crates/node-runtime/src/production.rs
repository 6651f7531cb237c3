//! Block-production pipelines driven by `main.rs`'s two cadence tickers:
//! PoRW folding submissions and PoRS storage-reward batches. Both paths
//! assemble a full [`Block`] the same way a block arriving from a peer
//! would be assembled, submit it through [`ConsensusDriver`] exactly as
//! gossip does, and relay it to every other peer on acceptance.

use std::sync::Arc;

use qc_chain_store::ChainStore;
use qc_consensus::ConsensusDriver;
use qc_mempool::Mempool;
use qc_porw::PorwEngine;
use qc_pors::PorsEngine;
use shared_bus::{BlockchainEvent, EventPublisher};
use shared_crypto::canonical::canonical_hash;
use shared_crypto::{address, Secp256k1KeyPair};
use shared_types::{
    Address, Block, BlockType, FixedPoint, MessageType, PeerId, PorsBlock, PorsProof, PorwBlock,
    QuorumSignature, Transaction, TransactionStatus, WireFrame, ZERO_ADDRESS,
};
use tracing::info;

use crate::transport::now_unix;
use crate::wiring::Node;

fn coinbase_transaction(recipient: Address, amount: FixedPoint, timestamp: u64) -> Transaction {
    let mut tx = Transaction {
        id: [0u8; 32],
        sender: Address::new_unchecked(ZERO_ADDRESS.to_string()),
        recipient,
        amount: Some(amount),
        fee: FixedPoint::ZERO,
        timestamp,
        signature: None,
        memo: None,
        confidential_data: None,
        status: TransactionStatus::Confirmed,
    };
    tx.id = canonical_hash(&(tx.sender.as_str(), tx.recipient.as_str(), tx.amount, tx.fee, tx.timestamp))
        .expect("coinbase fields are always hashable");
    tx
}

/// Fan a freshly produced block out to every registered peer, mirroring
/// `transport::relay_to_others`'s gossip path for blocks arriving over the
/// wire.
async fn relay_block(node: &Node, local_node_id: PeerId, block: &Block) {
    let frame = WireFrame::new(MessageType::NewBlock, local_node_id, serde_json::json!(block), now_unix());
    for (_, sender) in node.peer_registry.others(&local_node_id) {
        sender.send(frame.clone()).await.ok();
    }
}

async fn submit_and_relay(node: &Node, local_node_id: PeerId, block: Block) -> anyhow::Result<()> {
    let hash = block.block_hash();
    match node.consensus.on_block_received(block.clone()) {
        Ok(_) => {
            node.events.publish(BlockchainEvent::BlockValidated(block.clone())).await;
            node.events
                .publish(BlockchainEvent::BlockStored { block_height: block.index(), block_hash: hash })
                .await;
            relay_block(node, local_node_id, &block).await;
            info!(index = block.index(), "produced and stored block");
            Ok(())
        }
        Err(err) => {
            node.events.publish(BlockchainEvent::BlockRejected { hash, reason: err.to_string() }).await;
            Err(anyhow::anyhow!("produced block rejected by consensus driver: {err}"))
        }
    }
}

/// Attempt one PoRW folding submission: pick a target, score it through
/// the compute backend, and submit a full block if the resulting proof
/// clears this engine's score threshold.
pub async fn try_produce_porw(node: &Arc<Node>, _identity: &Arc<Secp256k1KeyPair>, local_node_id: PeerId) -> anyhow::Result<()> {
    let target = node.porw.select_target()?;
    let now = now_unix();

    let last_porw_timestamp =
        node.chain_store.latest_by_type(BlockType::PoRW, None)?.map(|b| b.header().timestamp);

    // No external structure-data store is wired into this node yet (the
    // folding simulation itself lives entirely outside spec.md's scope);
    // the target's own identifier stands in for the coordinate payload
    // the compute backend scores.
    let coordinates = target.identifier.to_vec();

    let (porw_proof, minted_amount, protein_data_ref) =
        node.porw.produce_proof(target.identifier, coordinates, last_porw_timestamp, now).await?;

    let recipient = address::from_public_key(address::VERSION_MAINNET, &local_node_id.0);
    let coinbase = coinbase_transaction(recipient, minted_amount, now);

    let tip = node.chain_store.latest()?;
    let tip_header = tip.as_ref().map(Block::header);
    let (index, previous_hash) = qc_consensus::domain::assembly::next_position(tip_header);

    let mut block = Block::PoRW(PorwBlock {
        header: shared_types::BlockHeader { index, previous_hash, timestamp: now, block_hash: [0u8; 32], block_type: BlockType::PoRW },
        protein_data_ref,
        porw_proof,
        minted_amount,
        coinbase,
    });

    let body_digest = qc_validator::block_body_digest(&block)?;
    let header = qc_consensus::domain::assembly::assemble_header(tip_header, now, BlockType::PoRW, body_digest)?;
    if let Block::PoRW(ref mut b) = block {
        b.header = header;
    }

    submit_and_relay(node, local_node_id, block).await
}

/// Attempt one PoRS batch: self-sign this round's challenge and, once the
/// single-node bootstrap quorum is met, bundle the highest-fee mempool
/// transactions into a block paying their fees out as storage rewards.
pub async fn try_produce_pors(node: &Arc<Node>, identity: &Arc<Secp256k1KeyPair>, local_node_id: PeerId, now: u64) -> anyhow::Result<()> {
    let tip = node.chain_store.latest()?;
    let tip_header = tip.as_ref().map(Block::header);
    let tip_hash = tip_header.map_or([0u8; 32], |h| h.block_hash);

    let challenge_ids = vec![canonical_hash(&(tip_hash, now))?];
    let round_id = canonical_hash(&challenge_ids)?;
    let self_signature = QuorumSignature { node_id: local_node_id, signature: identity.sign(&round_id) };

    let quorum_signatures = node.pors.aggregate_quorum(round_id, vec![self_signature])?;

    let transactions = node.mempool.by_fee(None, node.mempool.len());
    let fee_total = transactions.iter().fold(FixedPoint::ZERO, |acc, tx| acc.checked_add(tx.fee).unwrap_or(acc));

    let recipient = address::from_public_key(address::VERSION_MAINNET, &local_node_id.0);
    let mut storage_rewards = std::collections::BTreeMap::new();
    if fee_total != FixedPoint::ZERO {
        storage_rewards.insert(recipient, fee_total);
    }

    let pors_proof = PorsProof { challenge_ids, quorum_signatures, storage_rewards };

    let (index, previous_hash) = qc_consensus::domain::assembly::next_position(tip_header);
    let mut block = Block::PoRS(PorsBlock {
        header: shared_types::BlockHeader { index, previous_hash, timestamp: now, block_hash: [0u8; 32], block_type: BlockType::PoRS },
        transactions,
        pors_proof,
    });

    let body_digest = qc_validator::block_body_digest(&block)?;
    let header = qc_consensus::domain::assembly::assemble_header(tip_header, now, BlockType::PoRS, body_digest)?;
    if let Block::PoRS(ref mut b) = block {
        b.header = header;
    }

    submit_and_relay(node, local_node_id, block).await
}
