pub mod inbound;

pub use inbound::P2pEngine;
