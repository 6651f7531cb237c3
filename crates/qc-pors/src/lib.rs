//! # qc-pors
//!
//! Proof-of-Reliable-Storage engine (spec.md §4.8): splitting payloads into
//! fixed-size chunks, issuing and verifying storage challenges, tracking
//! per-node reliability, aggregating quorum attestations for a PoRS block,
//! and scheduling replication when a chunk's observed replica count falls
//! below policy. Block assembly — chain position, header hashing, the
//! storage-reward distribution table — is the consensus driver's
//! responsibility, not this crate's.

#![warn(missing_docs)]
#![allow(missing_docs)]

pub mod domain;
pub mod ports;
mod service;

pub use domain::challenge::{Challenge, ChallengeKind};
pub use domain::chunk::Chunk;
pub use domain::errors::PorsError;
pub use domain::replication::ReplicationDecision;
pub use ports::{ChunkSource, PorsEngine};
pub use service::PorsEngineService;
