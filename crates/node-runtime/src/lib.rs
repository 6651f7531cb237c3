//! # node-runtime
//!
//! Composition root for a Quantum-Chain node: configuration, genesis
//! construction, subsystem wiring, and the TCP wire transport. The
//! binary entry point in `main.rs` is a thin shell over this library so
//! the wiring and transport can be exercised directly in tests.

pub mod config;
pub mod genesis;
pub mod production;
pub mod transport;
pub mod wiring;
