// src/sources/foundry.rs
use serde::Deserialize;

use super::ExtractError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PoolStats {
    hashrate1hr_avg: f64,
}

/// `{"hashrate1hrAvg": <H/s>, ...}`
pub fn extract(body: &str) -> Result<f64, ExtractError> {
    let stats: PoolStats = serde_json::from_str(body)?;
    Ok(stats.hashrate1hr_avg)
}
