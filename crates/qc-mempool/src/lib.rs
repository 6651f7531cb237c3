//! # qc-mempool
//!
//! Fee-ordered pool of pending, not-yet-included transactions (spec.md
//! §4.5). Unique by transaction id; evicts lowest-fee/oldest entries once
//! at capacity; pruned by the caller on block application and reorg.

#![warn(missing_docs)]
#![allow(missing_docs)]

pub mod domain;
pub mod ports;
mod service;

pub use domain::errors::MempoolError;
pub use ports::Mempool;
pub use service::MempoolService;
