pub mod inbound;
pub mod outbound;

pub use inbound::Validator;
pub use outbound::{BalanceSource, ConfidentialProofVerifier, TotalSupplySource};
