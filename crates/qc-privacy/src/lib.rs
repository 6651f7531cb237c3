//! # qc-privacy
//!
//! Confidential transfers, stealth payment hints, and the coin-mixing
//! coordinator (spec.md §4.11). Every scheme here is opt-in: plain
//! transactions and addresses work exactly as `qc-validator` and
//! `shared-crypto` already define them, and nothing in this crate
//! changes their wire formats.

#![warn(missing_docs)]
#![allow(missing_docs)]

pub mod domain;
pub mod ports;
mod service;

pub use domain::blind_sign::BlindSignature;
pub use domain::errors::PrivacyError;
pub use domain::mixing::{MixingEvent, MixingPhase, PhaseTimeouts};
pub use domain::range_proof::{RangeProof, RangeProofBundle, RANGE_BITS};
pub use domain::stealth::StealthHint;
pub use ports::{ConfidentialTransferBuilder, MixingCoordinator, SessionId, StealthAddressing};
pub use service::PrivacyService;
