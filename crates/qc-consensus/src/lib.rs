//! # qc-consensus
//!
//! Drives block production cadence, applies the validate/apply/reorg/
//! gossip flow for incoming blocks, and commits periodic checkpoints
//! (spec.md §4.10). Composes `qc-validator`, `qc-chain-store`, `qc-state`,
//! `qc-mempool`, `qc-porw`, and `qc-pors` behind a single inbound port;
//! owns no socket and publishes no bus events itself — node-runtime
//! relays `BlockOutcome` onto the wire and the event bus.

#![warn(missing_docs)]
#![allow(missing_docs)]

pub mod domain;
pub mod ports;
mod service;

pub use domain::errors::ConsensusError;
pub use domain::outcome::BlockOutcome;
pub use ports::ConsensusDriver;
pub use service::ConsensusDriverService;
