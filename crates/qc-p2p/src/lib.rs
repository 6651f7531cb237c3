//! # qc-p2p
//!
//! Peer connection lifecycle (spec.md §4.9): the per-peer state machine,
//! `HELLO` handshake validation, 0-100 reputation scoring with
//! exponential-backoff bans, and gossip-relay dedup that caps fan-out.
//! Opening sockets and framing bytes on the wire is node-runtime's
//! concern; this crate only decides what the protocol state should be.

#![warn(missing_docs)]
#![allow(missing_docs)]

pub mod domain;
pub mod ports;
mod service;

pub use domain::errors::P2pError;
pub use ports::P2pEngine;
pub use service::P2pEngineService;
