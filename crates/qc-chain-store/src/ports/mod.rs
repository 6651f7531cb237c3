pub mod inbound;
pub mod outbound;

pub use inbound::ChainStore;
pub use outbound::{BatchOperation, KeyValueStore};
