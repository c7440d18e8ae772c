// src/sources/antpool.rs
use serde::Deserialize;

use super::{parse_number_prefix, ExtractError};

#[derive(Debug, Deserialize)]
struct Envelope {
    data: Data,
}

#[derive(Debug, Deserialize)]
struct Data {
    items: Vec<Coin>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Coin {
    pool_hashrate: String,
}

/// `{"data": {"items": [{"poolHashrate": "612.35 EH/s"}, ...]}}`; the first
/// item is BTC. Only the numeric prefix is kept, the unit suffix is ignored.
pub fn extract(body: &str) -> Result<f64, ExtractError> {
    let env: Envelope = serde_json::from_str(body)?;
    let first = env
        .data
        .items
        .first()
        .ok_or(ExtractError::EmptySeries("data.items"))?;
    parse_number_prefix(&first.pool_hashrate, "data.items[0].poolHashrate")
}
