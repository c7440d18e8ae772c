//! Reported hashrate poller — binary entrypoint.
//! Loads config, wires registry + store, and ticks the poller on a timer
//! until ctrl-c.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pool_hashrate_poller::registry::InMemoryPoolRegistry;
use pool_hashrate_poller::storage::JsonFileHashrateStore;
use pool_hashrate_poller::{spawn_hashrate_task, PollerConfig, PoolReportedHashrate};

/// `RUST_LOG` filter; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pool_hashrate_poller=info,mining=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = PollerConfig::load_default().context("loading poller config")?;
    tracing::info!(
        network = %cfg.network,
        run_interval_secs = cfg.run_interval_secs,
        tick_interval_secs = cfg.tick_interval_secs,
        "poller config loaded"
    );

    if let Ok(addr) = std::env::var("METRICS_ADDR") {
        let addr = addr
            .parse()
            .with_context(|| format!("METRICS_ADDR is not a socket address: {addr}"))?;
        pool_hashrate_poller::metrics::install_prometheus(addr)?;
        tracing::info!(%addr, "prometheus exporter listening");
    }

    let registry = Arc::new(InMemoryPoolRegistry::from_entries(&cfg.pools));
    let store = Arc::new(JsonFileHashrateStore::open(&cfg.store_path).await?);
    let poller = Arc::new(PoolReportedHashrate::from_config(&cfg, registry, store)?);

    let task = spawn_hashrate_task(poller, cfg.tick_interval());

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    tracing::info!("shutting down");
    task.abort();
    Ok(())
}
