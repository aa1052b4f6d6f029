use resilient_api_cache::CacheSnapshot;
use resilient_api_circuitbreaker::{BreakerSnapshot, CircuitState};
use resilient_api_core::time::now_millis;
use resilient_api_scheduler::JobStatus;
use serde::Serialize;
use std::collections::BTreeMap;
use tokio::time::Instant;

/// Breaker diagnostics with wall-clock times, ready to show an operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakerStatus {
    /// Name of the breaker instance.
    pub name: String,
    /// Current state.
    pub state: CircuitState,
    /// Failures recorded since the last success.
    pub consecutive_failures: u32,
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,
    /// Epoch milliseconds of the most recent failure.
    pub last_failure_at_ms: Option<u64>,
    /// Epoch milliseconds at which an open circuit admits a probe.
    pub next_probe_at_ms: Option<u64>,
    /// Whether a half-open probe call is in progress.
    pub probe_in_flight: bool,
}

impl BreakerStatus {
    /// Converts the monotonic instants of `snapshot` to epoch milliseconds,
    /// relative to `now_ms`.
    pub fn from_snapshot(snapshot: &BreakerSnapshot, now_ms: u64) -> Self {
        let now = Instant::now();
        let wall = |at: Instant| {
            if at >= now {
                now_ms + (at - now).as_millis() as u64
            } else {
                now_ms.saturating_sub((now - at).as_millis() as u64)
            }
        };

        Self {
            name: snapshot.name.clone(),
            state: snapshot.state,
            consecutive_failures: snapshot.consecutive_failures,
            failure_threshold: snapshot.failure_threshold,
            last_failure_at_ms: snapshot.last_failure_at.map(wall),
            next_probe_at_ms: snapshot.next_probe_at.map(wall),
            probe_in_flight: snapshot.probe_in_flight,
        }
    }
}

/// Everything the admin panel shows, collected at one moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemStatus {
    /// Epoch milliseconds at which the status was collected.
    pub timestamp: u64,
    /// Circuit breaker state.
    pub breaker: BreakerStatus,
    /// Cache contents and freshness.
    pub cache: CacheSnapshot,
    /// Whether background jobs are scheduled.
    pub scheduler_running: bool,
    /// Per-job run statistics, keyed by job name.
    pub jobs: BTreeMap<String, JobStatus>,
}

impl SystemStatus {
    pub(crate) fn collect(
        breaker: &BreakerSnapshot,
        cache: CacheSnapshot,
        scheduler_running: bool,
        jobs: impl IntoIterator<Item = (String, JobStatus)>,
    ) -> Self {
        let timestamp = now_millis();
        Self {
            timestamp,
            breaker: BreakerStatus::from_snapshot(breaker, timestamp),
            cache,
            scheduler_running,
            jobs: jobs.into_iter().collect(),
        }
    }

    /// Whether requests are currently reaching the upstream.
    pub fn is_healthy(&self) -> bool {
        self.breaker.state == CircuitState::Closed
    }
}
