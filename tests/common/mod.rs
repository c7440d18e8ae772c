// tests/common/mod.rs
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use pool_hashrate_poller::hashrate::HashrateSample;
use pool_hashrate_poller::registry::{Pool, PoolRegistry};
use pool_hashrate_poller::sources::{SourceDescriptor, SourceKind, SourceSet};
use pool_hashrate_poller::storage::{HashrateStore, InMemoryHashrateStore};
use std::collections::HashSet;
use tokio::sync::Notify;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const FOUNDRY: &str = include_str!("../fixtures/foundry_pool_stats.json");
pub const ANTPOOL: &str = include_str!("../fixtures/antpool_poolcoins.json");
pub const VIABTC: &str = include_str!("../fixtures/viabtc_chart.json");
pub const BINANCE: &str = include_str!("../fixtures/binance_pool_index.json");
pub const LUXOR: &str = include_str!("../fixtures/luxor_mining.json");

pub fn route(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::FoundryUsa => "/foundry/pool_stats",
        SourceKind::AntPool => "/antpool/poolcoins",
        SourceKind::ViaBtc => "/viabtc/chart",
        SourceKind::BinancePool => "/binance/pool/index",
        SourceKind::Luxor => "/luxor/mining.json",
    }
}

pub fn fixture(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::FoundryUsa => FOUNDRY,
        SourceKind::AntPool => ANTPOOL,
        SourceKind::ViaBtc => VIABTC,
        SourceKind::BinancePool => BINANCE,
        SourceKind::Luxor => LUXOR,
    }
}

/// All five sources pointed at `server`.
pub fn sources_on(server: &MockServer) -> SourceSet {
    let list = SourceKind::ALL
        .iter()
        .map(|k| SourceDescriptor::new(*k, format!("{}{}", server.uri(), route(*k))))
        .collect();
    SourceSet::new(list).expect("unique ids")
}

pub async fn serve(server: &MockServer, kind: SourceKind, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route(kind)))
        .respond_with(response)
        .mount(server)
        .await;
}

pub async fn serve_all_fixtures(server: &MockServer) {
    for k in SourceKind::ALL {
        serve(server, k, ResponseTemplate::new(200).set_body_string(fixture(k))).await;
    }
}

/// Registry knowing every built-in pool except `missing`.
pub struct TestRegistry {
    missing: HashSet<u32>,
}

impl TestRegistry {
    pub fn all() -> Self {
        Self {
            missing: HashSet::new(),
        }
    }

    pub fn without(ids: &[u32]) -> Self {
        Self {
            missing: ids.iter().copied().collect(),
        }
    }
}

#[async_trait::async_trait]
impl PoolRegistry for TestRegistry {
    async fn pool_by_unique_id(&self, unique_id: u32) -> Result<Option<Pool>> {
        if self.missing.contains(&unique_id) {
            return Ok(None);
        }
        Ok(SourceKind::ALL
            .iter()
            .find(|k| k.pool_id() == unique_id)
            .map(|k| Pool {
                unique_id,
                name: k.name().to_string(),
            }))
    }
}

/// Registry whose lookups signal `entered`, then wait for `release`.
pub struct BlockingRegistry {
    pub entered: Notify,
    pub release: Notify,
}

impl BlockingRegistry {
    pub fn new() -> Self {
        Self {
            entered: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait::async_trait]
impl PoolRegistry for BlockingRegistry {
    async fn pool_by_unique_id(&self, _unique_id: u32) -> Result<Option<Pool>> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(None)
    }
}

/// In-memory store that refuses samples of some pools.
pub struct FlakyStore {
    pub inner: InMemoryHashrateStore,
    pub reject: HashSet<u32>,
}

#[async_trait::async_trait]
impl HashrateStore for FlakyStore {
    async fn save_hashrate(&self, sample: &HashrateSample) -> Result<()> {
        if self.reject.contains(&sample.pool_id) {
            return Err(anyhow!("deadlock found when trying to get lock"));
        }
        self.inner.save_hashrate(sample).await
    }
}

/// Store that panics on the first save.
pub struct PanickingStore;

#[async_trait::async_trait]
impl HashrateStore for PanickingStore {
    async fn save_hashrate(&self, _sample: &HashrateSample) -> Result<()> {
        panic!("storage invariant violated");
    }
}
