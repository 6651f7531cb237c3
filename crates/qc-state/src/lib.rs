//! # qc-state
//!
//! Account balances, total supply, and collected fees, derived from block
//! application (spec.md §4.4). Materialized for O(1) balance lookup and
//! committed to via a sorted-leaves Merkle root for `snapshot`/`verify`.

#![warn(missing_docs)]
#![allow(missing_docs)]

pub mod domain;
pub mod ports;
mod service;

pub use domain::errors::StateError;
pub use ports::StateManager;
pub use service::StateService;
