// src/sources/binance.rs
use serde::Deserialize;

use super::{ExtractError, NumberOrString};

#[derive(Debug, Deserialize)]
struct Envelope {
    data: Index,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Index {
    algo_list: Vec<Algo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Algo {
    pool_hash: NumberOrString,
}

/// `{"data": {"algoList": [{"poolHash": "<number>"}, ...]}}`; SHA256 is listed first.
pub fn extract(body: &str) -> Result<f64, ExtractError> {
    let env: Envelope = serde_json::from_str(body)?;
    let first = env
        .data
        .algo_list
        .first()
        .ok_or(ExtractError::EmptySeries("data.algoList"))?;
    first.pool_hash.to_f64("data.algoList[0].poolHash")
}
