// src/poller.rs
//! Reported hashrate poller: queries every supported pool API once per
//! cycle and stores one sample per pool. A failing pool is logged and
//! skipped; it never stops the others.

use anyhow::Result;
use chrono::{DateTime, Utc};
use metrics::{counter, gauge, histogram};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, trace};

use crate::clock::{Clock, SystemClock};
use crate::config::{Network, PollerConfig};
use crate::hashrate::HashrateSample;
use crate::metrics::{
    ensure_metrics_described, CYCLES_TOTAL, FETCH_MS, LAST_RUN_TS, SAVED_TOTAL,
    SOURCE_ERRORS_TOTAL,
};
use crate::registry::{Pool, PoolRegistry};
use crate::scheduler::{GateRejection, RunGuard, RunState};
use crate::sources::{ExtractError, SourceDescriptor, SourceSet};
use crate::storage::HashrateStore;

/// Why one pool was skipped in a cycle.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("pool with unique id {0} is not in the pool registry")]
    UnknownPool(u32),
    #[error("pool registry lookup failed: {0:#}")]
    Registry(anyhow::Error),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("empty response body")]
    EmptyBody,
    #[error("unexpected response: {0}")]
    Extract(#[from] ExtractError),
    #[error("saving hashrate failed: {0:#}")]
    Persist(anyhow::Error),
}

impl SourceError {
    /// Short label used as a metrics dimension.
    pub fn reason(&self) -> &'static str {
        match self {
            SourceError::UnknownPool(_) => "unknown_pool",
            SourceError::Registry(_) => "registry",
            SourceError::Transport(_) => "transport",
            SourceError::HttpStatus(_) => "http_status",
            SourceError::EmptyBody => "empty_body",
            SourceError::Extract(_) => "extract",
            SourceError::Persist(_) => "persist",
        }
    }
}

#[derive(Debug)]
pub enum SourceOutcome {
    Saved { pool: Pool, sample: HashrateSample },
    Skipped { pool_id: u32, error: SourceError },
}

impl SourceOutcome {
    pub fn pool_id(&self) -> u32 {
        match self {
            SourceOutcome::Saved { pool, .. } => pool.unique_id,
            SourceOutcome::Skipped { pool_id, .. } => *pool_id,
        }
    }
}

/// Per-source results of one cycle, in source order.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub outcomes: Vec<SourceOutcome>,
}

impl CycleReport {
    pub fn saved(&self) -> impl Iterator<Item = &HashrateSample> {
        self.outcomes.iter().filter_map(|o| match o {
            SourceOutcome::Saved { sample, .. } => Some(sample),
            SourceOutcome::Skipped { .. } => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = (u32, &SourceError)> {
        self.outcomes.iter().filter_map(|o| match o {
            SourceOutcome::Skipped { pool_id, error } => Some((*pool_id, error)),
            SourceOutcome::Saved { .. } => None,
        })
    }

    pub fn saved_count(&self) -> usize {
        self.saved().count()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped().count()
    }

    pub fn outcome_for(&self, pool_id: u32) -> Option<&SourceOutcome> {
        self.outcomes.iter().find(|o| o.pool_id() == pool_id)
    }
}

/// What a single `tick` did.
#[derive(Debug)]
pub enum TickOutcome {
    /// Not the primary network; the job never runs here.
    Ineligible(Network),
    Busy,
    TooSoon { next_eligible: DateTime<Utc> },
    Completed(CycleReport),
    /// The cycle itself aborted; the cadence window was not consumed.
    Failed(String),
}

impl TickOutcome {
    pub fn ran(&self) -> bool {
        matches!(self, TickOutcome::Completed(_) | TickOutcome::Failed(_))
    }
}

pub struct PoolReportedHashrate {
    network: Network,
    sources: SourceSet,
    client: reqwest::Client,
    registry: Arc<dyn PoolRegistry>,
    store: Arc<dyn HashrateStore>,
    clock: Arc<dyn Clock>,
    guard: Arc<RunGuard>,
}

impl PoolReportedHashrate {
    /// Poller over the built-in pools, endpoints overridden from `cfg`.
    pub fn from_config(
        cfg: &PollerConfig,
        registry: Arc<dyn PoolRegistry>,
        store: Arc<dyn HashrateStore>,
    ) -> Result<Self> {
        let sources = SourceSet::builtin_with_endpoints(&cfg.endpoint_overrides()?)?;
        Self::new(cfg, sources, registry, store)
    }

    pub fn new(
        cfg: &PollerConfig,
        sources: SourceSet,
        registry: Arc<dyn PoolRegistry>,
        store: Arc<dyn HashrateStore>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(cfg.user_agent.as_str())
            .connect_timeout(cfg.http_timeout().min(std::time::Duration::from_secs(5)))
            .timeout(cfg.http_timeout())
            .build()?;
        ensure_metrics_described();
        Ok(Self {
            network: cfg.network,
            sources,
            client,
            registry,
            store,
            clock: Arc::new(SystemClock),
            guard: Arc::new(RunGuard::new(cfg.run_interval())),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn sources(&self) -> &SourceSet {
        &self.sources
    }

    pub fn run_state(&self) -> RunState {
        self.guard.state()
    }

    /// Timer entry point. Runs a cycle only on the primary network, when no
    /// other cycle is in flight and the last successful one is at least one
    /// interval old.
    pub async fn tick(self: &Arc<Self>) -> TickOutcome {
        if !self.network.is_primary() {
            return TickOutcome::Ineligible(self.network);
        }

        let permit = match self.guard.try_begin(self.clock.now()) {
            Ok(p) => p,
            Err(GateRejection::Busy) => {
                trace!(target: "mining", "reported hashrate cycle already running");
                return TickOutcome::Busy;
            }
            Err(GateRejection::TooSoon { next_eligible }) => {
                trace!(target: "mining", %next_eligible, "reported hashrate cycle not due");
                return TickOutcome::TooSoon { next_eligible };
            }
        };

        // The cycle task owns the permit: dropping this future does not
        // release the gate while the cycle is still running, and a panic in
        // any adapter surfaces here as a JoinError.
        let this = Arc::clone(self);
        let cycle = tokio::spawn(async move {
            let report = this.fetch_all().await;
            let finished = this.clock.now();
            permit.succeed(finished);
            counter!(CYCLES_TOTAL, "outcome" => "ok").increment(1);
            gauge!(LAST_RUN_TS).set(finished.timestamp() as f64);
            info!(
                target: "mining",
                saved = report.saved_count(),
                skipped = report.skipped_count(),
                "reported hashrate cycle done"
            );
            report
        });
        match cycle.await {
            Ok(report) => TickOutcome::Completed(report),
            Err(e) => {
                counter!(CYCLES_TOTAL, "outcome" => "failed").increment(1);
                error!(target: "mining", error = %e, "Cannot fetch reported hashrates");
                TickOutcome::Failed(e.to_string())
            }
        }
    }

    /// One pass over every source. Never fails as a whole; each source's
    /// failure is logged and recorded in the report.
    pub async fn fetch_all(&self) -> CycleReport {
        let mut report = CycleReport {
            outcomes: Vec::with_capacity(self.sources.len()),
        };
        for src in self.sources.iter() {
            let outcome = match self.fetch_source(src).await {
                Ok((pool, sample)) => {
                    counter!(SAVED_TOTAL).increment(1);
                    SourceOutcome::Saved { pool, sample }
                }
                Err(error) => {
                    counter!(SOURCE_ERRORS_TOTAL, "reason" => error.reason()).increment(1);
                    error!(
                        target: "mining",
                        pool_id = src.pool_id,
                        url = %src.endpoint,
                        error = %error,
                        "Cannot fetch reported hashrate, ignoring pool"
                    );
                    SourceOutcome::Skipped {
                        pool_id: src.pool_id,
                        error,
                    }
                }
            };
            report.outcomes.push(outcome);
        }
        report
    }

    async fn fetch_source(
        &self,
        src: &SourceDescriptor,
    ) -> Result<(Pool, HashrateSample), SourceError> {
        let pool = self
            .registry
            .pool_by_unique_id(src.pool_id)
            .await
            .map_err(SourceError::Registry)?
            .ok_or(SourceError::UnknownPool(src.pool_id))?;

        debug!(
            target: "mining",
            pool = %pool.name,
            url = %src.endpoint,
            "Querying reported hashrate"
        );

        let t0 = std::time::Instant::now();
        let resp = self.client.get(&src.endpoint).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::HttpStatus(status));
        }
        let body = resp.text().await?;
        histogram!(FETCH_MS).record(t0.elapsed().as_secs_f64() * 1_000.0);
        if body.trim().is_empty() {
            return Err(SourceError::EmptyBody);
        }

        let draft = HashrateSample::reported(src.pool_id, self.clock.now());
        let sample = draft.with_hashrate(src.normalize(&body)?);

        self.store
            .save_hashrate(&sample)
            .await
            .map_err(SourceError::Persist)?;
        debug!(
            target: "mining",
            pool = %pool.name,
            hashrate = sample.avg_hashrate,
            "Saved reported hashrate"
        );
        Ok((pool, sample))
    }
}
