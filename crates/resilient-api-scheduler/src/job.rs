//! Job bookkeeping and the per-job task loop.

use crate::events::SchedulerEvent;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use resilient_api_core::time::unix_millis;
use resilient_api_core::EventListeners;
use serde::{Deserialize, Serialize, Serializer};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

#[cfg(feature = "metrics")]
use metrics::counter;

/// Type-erased job body. Errors are reported as strings.
pub(crate) type JobHandler = Arc<dyn Fn() -> BoxFuture<'static, Result<(), String>> + Send + Sync>;

/// What to do when a tick fires while the previous invocation of the same job
/// is still running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Start another invocation anyway; invocations may overlap.
    #[default]
    Allow,
    /// Skip the tick.
    Skip,
}

/// Observability snapshot of one registered job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobStatus {
    /// Time between ticks.
    #[serde(rename = "interval_ms", serialize_with = "duration_millis")]
    pub interval: Duration,
    /// When the most recent invocation finished.
    #[serde(rename = "last_run_at_ms", serialize_with = "time_millis")]
    pub last_run_at: Option<SystemTime>,
    /// When the next tick is due.
    #[serde(rename = "next_run_at_ms", serialize_with = "time_millis")]
    pub next_run_at: Option<SystemTime>,
    /// Finished invocations, successful or not.
    pub runs: u64,
    /// Invocations that returned an error or panicked.
    pub failures: u64,
    /// Whether an invocation is in progress.
    pub running: bool,
}

fn duration_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

fn time_millis<S: Serializer>(t: &Option<SystemTime>, s: S) -> Result<S::Ok, S::Error> {
    match t {
        Some(t) => s.serialize_some(&unix_millis(*t)),
        None => s.serialize_none(),
    }
}

/// Scheduler-wide context shared with every job task.
pub(crate) struct Shared {
    pub(crate) name: String,
    pub(crate) overlap: OverlapPolicy,
    pub(crate) event_listeners: EventListeners<SchedulerEvent>,
}

/// Mutable bookkeeping of one job.
pub(crate) struct JobState {
    job: String,
    interval: Duration,
    runs: AtomicU64,
    failures: AtomicU64,
    in_flight: AtomicUsize,
    last_run_at: Mutex<Option<SystemTime>>,
    next_run_at: Mutex<Option<SystemTime>>,
}

impl JobState {
    pub(crate) fn new(job: String, interval: Duration) -> Self {
        Self {
            job,
            interval,
            runs: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            last_run_at: Mutex::new(None),
            next_run_at: Mutex::new(Some(SystemTime::now())),
        }
    }

    pub(crate) fn status(&self) -> JobStatus {
        JobStatus {
            interval: self.interval,
            last_run_at: *self.last_run_at.lock(),
            next_run_at: *self.next_run_at.lock(),
            runs: self.runs.load(Ordering::Acquire),
            failures: self.failures.load(Ordering::Acquire),
            running: self.in_flight.load(Ordering::Acquire) > 0,
        }
    }

    fn finish(&self, failed: bool) {
        *self.last_run_at.lock() = Some(SystemTime::now());
        if failed {
            self.failures.fetch_add(1, Ordering::AcqRel);
        }
        self.runs.fetch_add(1, Ordering::AcqRel);
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A registered job: its bookkeeping plus the task driving it.
///
/// Dropping it cancels the tick loop; an invocation already running is left to
/// finish.
pub(crate) struct ActiveJob {
    pub(crate) state: Arc<JobState>,
    token: CancellationToken,
    _task: JoinHandle<()>,
}

impl ActiveJob {
    pub(crate) fn spawn(shared: Arc<Shared>, state: Arc<JobState>, handler: JobHandler) -> Self {
        let token = CancellationToken::new();
        let task = tokio::spawn(tick_loop(
            shared,
            Arc::clone(&state),
            handler,
            token.clone(),
        ));
        Self {
            state,
            token,
            _task: task,
        }
    }
}

impl Drop for ActiveJob {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn tick_loop(
    shared: Arc<Shared>,
    state: Arc<JobState>,
    handler: JobHandler,
    token: CancellationToken,
) {
    // the first tick completes immediately
    let mut ticker = tokio::time::interval(state.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        *state.next_run_at.lock() = Some(SystemTime::now() + state.interval);

        if shared.overlap == OverlapPolicy::Skip && state.in_flight.load(Ordering::Acquire) > 0 {
            report_skip(&shared, &state);
            continue;
        }

        state.in_flight.fetch_add(1, Ordering::AcqRel);
        tokio::spawn(invoke(
            Arc::clone(&shared),
            Arc::clone(&state),
            Arc::clone(&handler),
        ));
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(scheduler = %shared.name, job = %state.job, "job cancelled");
}

async fn invoke(shared: Arc<Shared>, state: Arc<JobState>, handler: JobHandler) {
    let started = Instant::now();

    #[cfg(feature = "tracing")]
    tracing::debug!(scheduler = %shared.name, job = %state.job, "job started");

    let outcome = AssertUnwindSafe(async move { handler().await })
        .catch_unwind()
        .await;
    let duration = started.elapsed();

    let error = match outcome {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e),
        Err(panic) => Some(panic_message(panic.as_ref())),
    };
    state.finish(error.is_some());

    #[cfg(feature = "metrics")]
    counter!(
        "scheduler_job_runs_total",
        "scheduler" => shared.name.clone(),
        "job" => state.job.clone(),
        "outcome" => if error.is_some() { "failure" } else { "success" }
    )
    .increment(1);

    match error {
        None => {
            #[cfg(feature = "tracing")]
            tracing::info!(
                scheduler = %shared.name,
                job = %state.job,
                duration_ms = duration.as_millis() as u64,
                "job finished"
            );

            shared.event_listeners.emit(&SchedulerEvent::JobSucceeded {
                name: shared.name.clone(),
                timestamp: Instant::now(),
                job: state.job.clone(),
                duration,
            });
        }
        Some(error) => {
            #[cfg(feature = "tracing")]
            tracing::error!(
                scheduler = %shared.name,
                job = %state.job,
                duration_ms = duration.as_millis() as u64,
                error = %error,
                "job failed"
            );

            shared.event_listeners.emit(&SchedulerEvent::JobFailed {
                name: shared.name.clone(),
                timestamp: Instant::now(),
                job: state.job.clone(),
                error,
                duration,
            });
        }
    }
}

fn report_skip(shared: &Shared, state: &JobState) {
    #[cfg(feature = "tracing")]
    tracing::debug!(scheduler = %shared.name, job = %state.job, "previous run still in progress, skipping tick");

    #[cfg(feature = "metrics")]
    counter!(
        "scheduler_job_runs_total",
        "scheduler" => shared.name.clone(),
        "job" => state.job.clone(),
        "outcome" => "skipped"
    )
    .increment(1);

    shared.event_listeners.emit(&SchedulerEvent::JobSkipped {
        name: shared.name.clone(),
        timestamp: Instant::now(),
        job: state.job.clone(),
    });
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}
