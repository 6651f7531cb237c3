pub mod inbound;
pub mod outbound;

pub use inbound::PorwEngine;
pub use outbound::FoldingTargetSource;
