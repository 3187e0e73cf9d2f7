//! Health gate — poll a slot until it is healthy or a deadline passes.
//!
//! The gate is used twice per deployment: before the traffic switch on the
//! freshly installed slot, and after the switch on the same slot now
//! carrying live traffic. A timeout is an ordinary outcome, not an error,
//! so the orchestrator decides what to clean up.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use cutover_core::{CancelSignal, Environment};

use crate::checker::HealthSource;

/// How a health gate ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Healthy {
        attempts: u32,
        elapsed: Duration,
    },
    TimedOut {
        attempts: u32,
        elapsed: Duration,
        /// What the last reading still reported as failing.
        last_failure: Vec<String>,
    },
    /// A termination signal arrived while waiting.
    Cancelled { attempts: u32, elapsed: Duration },
}

/// Floor on how long a single reading may take, for very short intervals.
const MIN_READING_BUDGET: Duration = Duration::from_millis(500);

/// Drives a [`HealthSource`] in a fixed-interval polling loop.
#[derive(Clone)]
pub struct HealthProber {
    source: Arc<dyn HealthSource>,
}

impl HealthProber {
    pub fn new(source: Arc<dyn HealthSource>) -> Self {
        Self { source }
    }

    /// Poll `env` every `interval` until it reports healthy, `timeout` has
    /// elapsed, or `cancel` fires.
    ///
    /// Readings start on a fixed schedule (`interval` apart, measured from
    /// the start of each reading) and the first one is taken immediately,
    /// so an already-healthy slot returns after a single probe. The last
    /// reading starts no later than the deadline and a reading that takes
    /// longer than `interval` counts as unhealthy, so a never-healthy slot
    /// times out no earlier than `timeout` and no later than `timeout`
    /// plus one interval (at least half a second).
    pub async fn wait_healthy(
        &self,
        env: &Environment,
        timeout: Duration,
        interval: Duration,
        cancel: &CancelSignal,
    ) -> ProbeOutcome {
        let mut cancel = cancel.clone();
        let started = Instant::now();
        let deadline = later(started, timeout);
        let budget = interval.max(MIN_READING_BUDGET);
        let mut next = started;
        let mut attempts = 0u32;

        info!(
            slot = %env.slot,
            address = %env.address(),
            timeout = ?timeout,
            interval = ?interval,
            "waiting for slot to become healthy"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(next) => {}
                _ = cancel.cancelled() => {
                    warn!(slot = %env.slot, attempts, "health gate cancelled");
                    return ProbeOutcome::Cancelled { attempts, elapsed: started.elapsed() };
                }
            }

            attempts += 1;
            let reading_started = Instant::now();
            let report = tokio::select! {
                report = self.source.probe(env) => Some(report),
                _ = tokio::time::sleep_until(later(reading_started, budget)) => None,
                _ = cancel.cancelled() => {
                    warn!(slot = %env.slot, attempts, "health gate cancelled");
                    return ProbeOutcome::Cancelled { attempts, elapsed: started.elapsed() };
                }
            };

            let failing = match report {
                Some(report) if report.is_healthy() => {
                    let elapsed = started.elapsed();
                    info!(slot = %env.slot, attempts, elapsed = ?elapsed, "slot is healthy");
                    return ProbeOutcome::Healthy { attempts, elapsed };
                }
                Some(report) => report.failing(),
                None => vec![format!("no health reading within {budget:?}")],
            };
            debug!(slot = %env.slot, attempts, failing = ?failing, "slot not healthy yet");

            let now = Instant::now();
            if now >= deadline {
                let elapsed = now - started;
                warn!(
                    slot = %env.slot,
                    attempts,
                    elapsed = ?elapsed,
                    failing = ?failing,
                    "health gate timed out"
                );
                return ProbeOutcome::TimedOut {
                    attempts,
                    elapsed,
                    last_failure: failing,
                };
            }

            next = later(reading_started, interval).min(deadline);
        }
    }
}

/// `at + after`, saturating at roughly thirty years out.
fn later(at: Instant, after: Duration) -> Instant {
    at.checked_add(after)
        .unwrap_or_else(|| at + Duration::from_secs(86400 * 365 * 30))
}
