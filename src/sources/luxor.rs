// src/sources/luxor.rs
use serde::Deserialize;
use std::collections::HashMap;

use super::{ExtractError, NumberOrString};

const COIN: &str = "BTC";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page {
    page_props: PageProps,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageProps {
    coin_data: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoinStats {
    pool_hashrate: NumberOrString,
}

/// Next.js page data: `{"pageProps": {"coinData": {"BTC": {"poolHashrate": "<number>"}}}}`.
pub fn extract(body: &str) -> Result<f64, ExtractError> {
    let page: Page = serde_json::from_str(body)?;
    let btc = page
        .page_props
        .coin_data
        .get(COIN)
        .ok_or(ExtractError::MissingField("pageProps.coinData.BTC"))?;
    // Other coins may change shape independently; only BTC is decoded.
    let stats = CoinStats::deserialize(btc)?;
    stats
        .pool_hashrate
        .to_f64("pageProps.coinData.BTC.poolHashrate")
}
