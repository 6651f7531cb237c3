pub mod inbound;
pub mod outbound;

pub use inbound::PorsEngine;
pub use outbound::ChunkSource;
