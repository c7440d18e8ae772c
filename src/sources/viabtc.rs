// src/sources/viabtc.rs
use serde::Deserialize;

use super::ExtractError;

#[derive(Debug, Deserialize)]
struct Envelope {
    data: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    // Gaps in older points are fine; only the latest one is read.
    viabtc_hash: Vec<serde_json::Value>,
}

/// `{"data": {"viabtc_hash": [..., <latest>]}}`; the latest point is last.
pub fn extract(body: &str) -> Result<f64, ExtractError> {
    let env: Envelope = serde_json::from_str(body)?;
    let last = env
        .data
        .viabtc_hash
        .last()
        .ok_or(ExtractError::EmptySeries("data.viabtc_hash"))?;
    last.as_f64().ok_or_else(|| ExtractError::InvalidNumber {
        field: "data.viabtc_hash[last]",
        value: last.to_string(),
    })
}
