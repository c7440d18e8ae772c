// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod clock;
pub mod config;
pub mod hashrate;
pub mod metrics;
pub mod poller;
pub mod registry;
pub mod scheduler;
pub mod sources;
pub mod storage;

// ---- Re-exports for stable public API ----
pub use crate::config::{Network, PollerConfig};
pub use crate::hashrate::{HashrateKind, HashrateSample};
pub use crate::poller::{CycleReport, PoolReportedHashrate, SourceError, SourceOutcome, TickOutcome};
pub use crate::scheduler::spawn_hashrate_task;
