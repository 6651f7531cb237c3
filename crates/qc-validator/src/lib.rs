//! # qc-validator
//!
//! Transaction and block validation rules (spec.md §4.6). Re-derives
//! every check from first principles rather than trusting a
//! pre-validated flag carried by whatever delivered the entity — the
//! "Zero-Trust" stance the teacher's signature-verification crate also
//! takes, generalized here to the full rule set spec.md names.

#![warn(missing_docs)]
#![allow(missing_docs)]

pub mod domain;
pub mod ports;
mod service;

pub use domain::block_rules::{block_body_digest, canonical_header_hash};
pub use domain::errors::ValidatorError;
pub use domain::transaction_rules::canonical_body_hash;
pub use ports::{BalanceSource, ConfidentialProofVerifier, TotalSupplySource, Validator};
pub use service::ValidatorService;
