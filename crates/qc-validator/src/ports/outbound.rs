//! Outbound ports: what the validator needs from the rest of the node,
//! kept narrow so this crate does not depend on `qc-state`/`qc-privacy`
//! concrete types.

use shared_types::{Address, ConfidentialData, FixedPoint};

/// Current materialized balance for a sender, used for the sufficient-
/// funds check. Implemented by `qc-state::StateService` in the wired
/// node.
pub trait BalanceSource: Send + Sync {
    fn balance(&self, address: &Address) -> FixedPoint;
}

/// Current circulating supply, used to scale the PoRW reward formula.
/// Implemented by `qc-state::StateService`, which already tracks this as
/// part of its snapshot.
pub trait TotalSupplySource: Send + Sync {
    fn total_supply(&self) -> FixedPoint;
}

/// Range-proof verification for confidential transfers: checks the
/// commitment bundle without learning the amount. Implemented by
/// `qc-privacy`; a node running without privacy features wires in an
/// adapter that always rejects confidential transactions outright.
pub trait ConfidentialProofVerifier: Send + Sync {
    fn verify(&self, data: &ConfidentialData) -> bool;
}
