pub mod errors;
pub mod gossip;
pub mod handshake;
pub mod reputation;
pub mod state_machine;
