// src/metrics.rs
use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

pub const CYCLES_TOTAL: &str = "pool_hashrate_cycles_total";
pub const SAVED_TOTAL: &str = "pool_hashrate_saved_total";
pub const SOURCE_ERRORS_TOTAL: &str = "pool_hashrate_source_errors_total";
pub const FETCH_MS: &str = "pool_hashrate_fetch_ms";
pub const LAST_RUN_TS: &str = "pool_hashrate_last_run_ts";

/// One-time metrics registration (so series show up on the exporter).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(CYCLES_TOTAL, "Reported-hashrate cycles executed, by outcome.");
        describe_counter!(SAVED_TOTAL, "Reported hashrate samples persisted.");
        describe_counter!(
            SOURCE_ERRORS_TOTAL,
            "Pool sources skipped in a cycle, by reason."
        );
        describe_histogram!(FETCH_MS, "Pool API fetch time in milliseconds.");
        describe_gauge!(
            LAST_RUN_TS,
            "Unix ts of the last successful reported-hashrate cycle."
        );
    });
}

/// Install the Prometheus exporter HTTP listener on `addr`.
pub fn install_prometheus(addr: std::net::SocketAddr) -> anyhow::Result<()> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("prometheus: install exporter: {e}"))?;
    ensure_metrics_described();
    Ok(())
}
