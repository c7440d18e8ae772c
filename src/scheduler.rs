// src/scheduler.rs
//! Single-flight cadence guard and the timer task that drives it.

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::poller::PoolReportedHashrate;

/// Process-wide run state. Never persisted: a restarted process starts idle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunState {
    pub running: bool,
    /// Completion time of the last successful cycle.
    pub last_run: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateRejection {
    /// A cycle is already in flight.
    Busy,
    /// The last successful cycle is less than one interval old.
    TooSoon { next_eligible: DateTime<Utc> },
}

/// Reentrancy + cadence gate. Both checks and the "running" mark happen
/// under one lock, so at most one cycle is ever admitted at a time.
#[derive(Debug)]
pub struct RunGuard {
    interval: Duration,
    state: Mutex<RunState>,
}

impl RunGuard {
    pub fn new(interval: std::time::Duration) -> Self {
        Self {
            interval: Duration::from_std(interval).unwrap_or_else(|_| Duration::days(36_500)),
            state: Mutex::new(RunState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn state(&self) -> RunState {
        *self.lock()
    }

    /// Admit a cycle at `now`, or say why not. The returned permit owns the
    /// running flag until it is dropped, wherever the cycle ends up running.
    pub fn try_begin(self: &Arc<Self>, now: DateTime<Utc>) -> Result<RunPermit, GateRejection> {
        let mut st = self.lock();
        if st.running {
            return Err(GateRejection::Busy);
        }
        if let Some(last) = st.last_run {
            if now - last < self.interval {
                return Err(GateRejection::TooSoon {
                    next_eligible: last + self.interval,
                });
            }
        }
        st.running = true;
        Ok(RunPermit {
            guard: Arc::clone(self),
        })
    }
}

/// Held by the cycle itself while it runs.
#[derive(Debug)]
pub struct RunPermit {
    guard: Arc<RunGuard>,
}

impl RunPermit {
    /// Record a successful cycle that finished at `finished_at`.
    pub fn succeed(self, finished_at: DateTime<Utc>) {
        self.guard.lock().last_run = Some(finished_at);
    }
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.guard.lock().running = false;
    }
}

/// Spawn the timer task calling `tick` every `every`. The cadence gate, not
/// this period, decides how often a cycle actually runs.
pub fn spawn_hashrate_task(
    poller: Arc<PoolReportedHashrate>,
    every: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let outcome = poller.tick().await;
            tracing::trace!(target: "mining", ?outcome, "reported hashrate tick");
        }
    })
}
