// src/config/mod.rs
pub mod network;
pub mod poller;

pub use network::Network;
pub use poller::{PollerConfig, PoolEntry};
