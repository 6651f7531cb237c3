pub mod inbound;

pub use inbound::{ConfidentialTransferBuilder, MixingCoordinator, SessionId, StealthAddressing};
