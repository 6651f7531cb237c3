//! # qc-chain-store
//!
//! Durable, append-only chain store with secondary indices by block
//! index, block hash, block type, and transaction id/address — the
//! authoritative log every other subsystem reads from or gossips out of.

#![warn(missing_docs)]
#![allow(missing_docs)]

pub mod adapters;
pub mod domain;
pub mod ports;
mod service;

pub use adapters::{InMemoryKVStore, SledKVStore};
pub use domain::errors::StoreError;
pub use ports::{BatchOperation, ChainStore, KeyValueStore};
pub use service::ChainStoreService;
