// src/sources/mod.rs
//! Pool API adapters: one module per response schema, one closed enum
//! tying each schema to its pool id, endpoint and unit scale.

pub mod antpool;
pub mod binance;
pub mod foundry;
pub mod luxor;
pub mod viabtc;

use anyhow::{bail, Result};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

const GIGA: f64 = 1_000_000_000.0;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("response does not match expected schema: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("`{0}` is empty")]
    EmptySeries(&'static str),
    #[error("`{field}` is not a number: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
    #[error("hashrate is not a finite non-negative number: {0}")]
    OutOfRange(f64),
}

/// Conversion from the raw figure a pool reports to hashes/second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnitScale {
    /// Already in H/s.
    Identity,
    Multiply(f64),
    /// Divide, then round to the nearest integer.
    DivideRound(f64),
}

impl UnitScale {
    pub fn apply(self, raw: f64) -> Result<f64, ExtractError> {
        let v = match self {
            UnitScale::Identity => raw,
            UnitScale::Multiply(k) => raw * k,
            UnitScale::DivideRound(k) => (raw / k).round(),
        };
        if !v.is_finite() || v < 0.0 {
            return Err(ExtractError::OutOfRange(v));
        }
        Ok(v)
    }
}

/// Response schema of a supported pool API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Top-level `hashrate1hrAvg`, already in H/s.
    FoundryUsa,
    /// `data.items[0].poolHashrate`, a string such as `"612.35 EH/s"` read as a number prefix.
    AntPool,
    /// Last point of the `data.viabtc_hash` time series.
    ViaBtc,
    /// `data.algoList[0].poolHash`, numeric string.
    BinancePool,
    /// `pageProps.coinData.BTC.poolHashrate`, numeric string.
    Luxor,
}

impl SourceKind {
    pub const ALL: [SourceKind; 5] = [
        SourceKind::FoundryUsa,
        SourceKind::AntPool,
        SourceKind::ViaBtc,
        SourceKind::BinancePool,
        SourceKind::Luxor,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SourceKind::FoundryUsa => "Foundry USA",
            SourceKind::AntPool => "AntPool",
            SourceKind::ViaBtc => "ViaBTC",
            SourceKind::BinancePool => "Binance Pool",
            SourceKind::Luxor => "Luxor",
        }
    }

    /// Unique id of the pool in the pool registry.
    pub fn pool_id(self) -> u32 {
        match self {
            SourceKind::FoundryUsa => 111,
            SourceKind::AntPool => 44,
            SourceKind::ViaBtc => 73,
            SourceKind::BinancePool => 105,
            SourceKind::Luxor => 4,
        }
    }

    pub fn default_endpoint(self) -> &'static str {
        match self {
            SourceKind::FoundryUsa => "https://api.foundryusapool.com/pool_stats",
            SourceKind::AntPool => "https://www.antpool.com/auth/v3/index/poolcoins",
            SourceKind::ViaBtc => "https://www.viabtc.com/res/pool/BTC/state/usd/chart",
            SourceKind::BinancePool => "https://pool.binance.com/mining-api/v1/public/pool/index",
            SourceKind::Luxor => "https://luxor.tech/_next/data/meXMczO-GZZ-V3Xj2m2Kd/en/mining.json",
        }
    }

    pub fn unit_scale(self) -> UnitScale {
        match self {
            SourceKind::FoundryUsa => UnitScale::Identity,
            SourceKind::AntPool => UnitScale::Multiply(GIGA),
            SourceKind::ViaBtc | SourceKind::BinancePool | SourceKind::Luxor => {
                UnitScale::DivideRound(GIGA)
            }
        }
    }

    /// Raw figure as reported, before unit scaling.
    pub fn extract(self, body: &str) -> Result<f64, ExtractError> {
        match self {
            SourceKind::FoundryUsa => foundry::extract(body),
            SourceKind::AntPool => antpool::extract(body),
            SourceKind::ViaBtc => viabtc::extract(body),
            SourceKind::BinancePool => binance::extract(body),
            SourceKind::Luxor => luxor::extract(body),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceDescriptor {
    pub pool_id: u32,
    pub endpoint: String,
    pub kind: SourceKind,
}

impl SourceDescriptor {
    pub fn new(kind: SourceKind, endpoint: impl Into<String>) -> Self {
        Self {
            pool_id: kind.pool_id(),
            endpoint: endpoint.into(),
            kind,
        }
    }

    pub fn builtin(kind: SourceKind) -> Self {
        Self::new(kind, kind.default_endpoint())
    }

    pub fn unit_scale(&self) -> UnitScale {
        self.kind.unit_scale()
    }

    /// Extract and scale to hashes/second.
    pub fn normalize(&self, body: &str) -> Result<f64, ExtractError> {
        let raw = self.kind.extract(body)?;
        self.unit_scale().apply(raw)
    }
}

/// Immutable list of sources polled every cycle. Pool ids are unique.
#[derive(Debug, Clone)]
pub struct SourceSet {
    sources: Vec<SourceDescriptor>,
}

impl SourceSet {
    pub fn new(sources: Vec<SourceDescriptor>) -> Result<Self> {
        let mut seen = HashSet::new();
        for s in &sources {
            if !seen.insert(s.pool_id) {
                bail!("pool id {} is configured more than once", s.pool_id);
            }
        }
        Ok(Self { sources })
    }

    /// All supported pools at their default endpoints.
    pub fn builtin() -> Self {
        Self {
            sources: SourceKind::ALL
                .iter()
                .map(|k| SourceDescriptor::builtin(*k))
                .collect(),
        }
    }

    /// All supported pools, with endpoints replaced per pool id where given.
    pub fn builtin_with_endpoints(overrides: &HashMap<u32, String>) -> Result<Self> {
        let known: HashSet<u32> = SourceKind::ALL.iter().map(|k| k.pool_id()).collect();
        if let Some(unknown) = overrides.keys().find(|id| !known.contains(id)) {
            bail!("endpoint override for unsupported pool id {unknown}");
        }
        let sources = SourceKind::ALL
            .iter()
            .map(|k| match overrides.get(&k.pool_id()) {
                Some(url) => SourceDescriptor::new(*k, url.clone()),
                None => SourceDescriptor::builtin(*k),
            })
            .collect();
        Self::new(sources)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceDescriptor> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Number that some APIs send as a JSON string and others as a JSON number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum NumberOrString {
    Number(f64),
    Text(String),
}

impl NumberOrString {
    pub(crate) fn to_f64(&self, field: &'static str) -> Result<f64, ExtractError> {
        match self {
            NumberOrString::Number(n) => Ok(*n),
            NumberOrString::Text(s) => {
                s.trim()
                    .parse::<f64>()
                    .map_err(|_| ExtractError::InvalidNumber {
                        field,
                        value: s.clone(),
                    })
            }
        }
    }
}

/// Leading decimal number of `s`, ignoring whatever follows ("612.35 EH/s" -> 612.35).
pub(crate) fn parse_number_prefix(s: &str, field: &'static str) -> Result<f64, ExtractError> {
    static RE_NUM: OnceCell<regex::Regex> = OnceCell::new();
    let re = RE_NUM.get_or_init(|| {
        regex::Regex::new(r"^\s*([+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)").unwrap()
    });
    re.captures(s)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .ok_or_else(|| ExtractError::InvalidNumber {
            field,
            value: s.to_string(),
        })
}
