// src/hashrate.rs
//! Canonical hashrate record handed to the storage collaborator.

use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel for fields a hashrate kind does not populate.
pub const NOT_USED: f64 = -1.0;

/// How a hashrate figure was obtained. Block-derived kinds live with the
/// block indexer; this crate only writes `Reported`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashrateKind {
    /// Self-reported by the pool through its public API.
    Reported,
}

impl fmt::Display for HashrateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HashrateKind::Reported => "reported",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashrateSample {
    /// Minute bucket this sample belongs to.
    pub timestamp: DateTime<Utc>,
    pub pool_id: u32,
    pub kind: HashrateKind,
    /// Hashes per second, or `NOT_USED` until extraction succeeds.
    pub avg_hashrate: f64,
    /// Network share; not populated for reported samples.
    pub share: f64,
}

/// Storage key: one sample per (pool, bucket, kind).
pub type SampleKey = (u32, DateTime<Utc>, HashrateKind);

impl HashrateSample {
    /// Draft of a reported sample for `pool_id` at `now`, bucketed to the minute.
    pub fn reported(pool_id: u32, now: DateTime<Utc>) -> Self {
        Self {
            timestamp: bucket_timestamp(now),
            pool_id,
            kind: HashrateKind::Reported,
            avg_hashrate: NOT_USED,
            share: NOT_USED,
        }
    }

    pub fn with_hashrate(mut self, hashes_per_sec: f64) -> Self {
        self.avg_hashrate = hashes_per_sec;
        self
    }

    pub fn key(&self) -> SampleKey {
        (self.pool_id, self.timestamp, self.kind)
    }
}

/// Truncate to the whole minute (seconds and sub-seconds zeroed).
pub fn bucket_timestamp(t: DateTime<Utc>) -> DateTime<Utc> {
    t.duration_trunc(Duration::minutes(1)).unwrap_or(t)
}
