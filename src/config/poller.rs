// src/config/poller.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::Network;
use crate::sources::SourceKind;

pub const ENV_CONFIG_PATH: &str = "POOL_HASHRATE_CONFIG";
pub const ENV_NETWORK: &str = "POOL_HASHRATE_NETWORK";
/// Network variable shared with the rest of the backend.
pub const ENV_NETWORK_FALLBACK: &str = "MEMPOOL_NETWORK";
pub const ENV_RUN_INTERVAL: &str = "POOL_HASHRATE_INTERVAL_SECS";

fn default_run_interval_secs() -> u64 {
    3600
}
fn default_tick_interval_secs() -> u64 {
    60
}
fn default_http_timeout_secs() -> u64 {
    10
}
fn default_user_agent() -> String {
    concat!("pool-hashrate-poller/", env!("CARGO_PKG_VERSION")).to_string()
}
fn default_store_path() -> PathBuf {
    PathBuf::from("state/pool_hashrates.json")
}
fn default_pools() -> Vec<PoolEntry> {
    SourceKind::ALL
        .iter()
        .map(|k| PoolEntry {
            unique_id: k.pool_id(),
            name: k.name().to_string(),
        })
        .collect()
}

/// Registry seed entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolEntry {
    pub unique_id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    #[serde(default)]
    pub network: Network,
    /// Minimum spacing between successful cycles.
    #[serde(default = "default_run_interval_secs")]
    pub run_interval_secs: u64,
    /// Timer trigger period; should be well below `run_interval_secs`.
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    /// Pool unique id (as string key) -> replacement endpoint URL.
    #[serde(default)]
    pub endpoints: HashMap<String, String>,
    #[serde(default = "default_pools")]
    pub pools: Vec<PoolEntry>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            network: Network::default(),
            run_interval_secs: default_run_interval_secs(),
            tick_interval_secs: default_tick_interval_secs(),
            http_timeout_secs: default_http_timeout_secs(),
            user_agent: default_user_agent(),
            store_path: default_store_path(),
            endpoints: HashMap::new(),
            pools: default_pools(),
        }
    }
}

impl PollerConfig {
    pub fn run_interval(&self) -> Duration {
        Duration::from_secs(self.run_interval_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs.max(1))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }

    /// Endpoint overrides keyed by numeric pool id.
    pub fn endpoint_overrides(&self) -> Result<HashMap<u32, String>> {
        self.endpoints
            .iter()
            .map(|(k, v)| {
                let id = k
                    .trim()
                    .parse::<u32>()
                    .with_context(|| format!("endpoint key {k:?} is not a pool id"))?;
                Ok((id, v.clone()))
            })
            .collect()
    }

    /// Load from an explicit path. Supports TOML or JSON.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading poller config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg = match ext.as_str() {
            "json" => serde_json::from_str(&content)
                .with_context(|| format!("parsing {}", path.display()))?,
            _ => toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?,
        };
        Ok(cfg)
    }

    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $POOL_HASHRATE_CONFIG
    /// 2) config/poller.toml
    /// 3) config/poller.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let toml_p = PathBuf::from("config/poller.toml");
            let json_p = PathBuf::from("config/poller.json");
            if toml_p.exists() {
                Self::load_from(&toml_p)?
            } else if json_p.exists() {
                Self::load_from(&json_p)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env()?;
        Ok(cfg)
    }

    fn apply_env(&mut self) -> Result<()> {
        let net = std::env::var(ENV_NETWORK).or_else(|_| std::env::var(ENV_NETWORK_FALLBACK));
        if let Ok(n) = net {
            self.network = n.parse()?;
        }
        if let Ok(v) = std::env::var(ENV_RUN_INTERVAL) {
            self.run_interval_secs = v
                .trim()
                .parse()
                .with_context(|| format!("{ENV_RUN_INTERVAL} must be whole seconds"))?;
        }
        Ok(())
    }
}
