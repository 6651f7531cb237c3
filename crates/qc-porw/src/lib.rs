//! # qc-porw
//!
//! Proof-of-Real-Work folding engine (spec.md §4.7): selecting candidate
//! folding targets, verifying submitted folding proofs against the
//! four-part acceptance contract, and computing a PoRW block's
//! time-adjusted `minted_amount`. Block assembly — chain position, header
//! hashing — is the consensus driver's responsibility, not this crate's.

#![warn(missing_docs)]
#![allow(missing_docs)]

pub mod domain;
pub mod ports;
mod service;

pub use domain::errors::PorwError;
pub use domain::target::FoldingTarget;
pub use ports::{FoldingTargetSource, PorwEngine};
pub use service::PorwEngineService;
