use crate::events::SchedulerEvent;
use crate::job::{ActiveJob, JobHandler, JobState, OverlapPolicy, Shared};
use crate::{JobStatus, SchedulerError};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use resilient_api_core::EventListeners;
use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub(crate) struct JobDefinition {
    pub(crate) name: String,
    pub(crate) interval: Duration,
    pub(crate) handler: JobHandler,
}

pub(crate) fn erase<F, Fut, E>(handler: F) -> JobHandler
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Display + 'static,
{
    Arc::new(move || -> BoxFuture<'static, Result<(), String>> {
        let fut = handler();
        Box::pin(async move { fut.await.map_err(|e| e.to_string()) })
    })
}

/// Runs named jobs on fixed intervals.
///
/// Each job runs on its own tokio task with its own cancellation token. A job
/// fires once as soon as it is registered and then every `interval`. Handler
/// errors and panics are logged and counted; they never stop later ticks.
///
/// Cloning is cheap; clones share the same job registry.
///
/// # Examples
///
/// ```rust
/// use resilient_api_scheduler::Scheduler;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), resilient_api_scheduler::SchedulerError> {
/// let scheduler = Scheduler::builder()
///     .name("cron")
///     .job("heartbeat", Duration::from_secs(60), || async {
///         Ok::<_, std::io::Error>(())
///     })
///     .build();
///
/// scheduler.start()?;
/// assert!(scheduler.status().contains_key("heartbeat"));
/// scheduler.stop();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<Shared>,
    definitions: Arc<Vec<JobDefinition>>,
    jobs: Arc<Mutex<HashMap<String, ActiveJob>>>,
    started: Arc<AtomicBool>,
}

impl Scheduler {
    /// Returns a new builder.
    pub fn builder() -> SchedulerBuilder {
        SchedulerBuilder::new()
    }

    /// Name of this scheduler.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Registers every configured job. Calling it again while started does
    /// nothing.
    pub fn start(&self) -> Result<(), SchedulerError> {
        tokio::runtime::Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;

        // the registry lock orders this against a concurrent stop
        let registered: Vec<_> = {
            let mut jobs = self.jobs.lock();
            if self.started.swap(true, Ordering::AcqRel) {
                return Ok(());
            }
            self.definitions
                .iter()
                .map(|def| {
                    let handler = Arc::clone(&def.handler);
                    self.insert(&mut jobs, def.name.clone(), def.interval, handler)
                })
                .collect()
        };

        #[cfg(feature = "tracing")]
        tracing::info!(scheduler = %self.shared.name, jobs = registered.len(), "scheduler started");

        for registration in registered {
            self.announce(registration);
        }
        Ok(())
    }

    /// Cancels every job and empties the registry. Invocations already running
    /// finish on their own. Calling it again does nothing.
    pub fn stop(&self) {
        let drained: Vec<_> = {
            let mut jobs = self.jobs.lock();
            self.started.store(false, Ordering::Release);
            jobs.drain().collect()
        };

        #[cfg(feature = "tracing")]
        if !drained.is_empty() {
            tracing::info!(scheduler = %self.shared.name, jobs = drained.len(), "scheduler stopped");
        }

        drop(drained);
    }

    /// Whether [`start`](Self::start) has been called without a later
    /// [`stop`](Self::stop).
    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Registers a job and fires it immediately. A job already registered
    /// under `name` is cancelled and replaced, so there is never more than one
    /// timer per name.
    pub fn register_job<F, Fut, E>(
        &self,
        name: impl Into<String>,
        interval: Duration,
        handler: F,
    ) -> Result<(), SchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + 'static,
    {
        let name = name.into();
        if interval.is_zero() {
            return Err(SchedulerError::InvalidInterval { job: name });
        }
        tokio::runtime::Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;

        let registration = self.insert(&mut self.jobs.lock(), name, interval, erase(handler));
        self.announce(registration);
        Ok(())
    }

    /// Cancels and removes one job. Returns whether it existed.
    pub fn remove_job(&self, name: &str) -> bool {
        self.jobs.lock().remove(name).is_some()
    }

    /// Status of every registered job, by name.
    pub fn status(&self) -> HashMap<String, JobStatus> {
        self.jobs
            .lock()
            .iter()
            .map(|(name, job)| (name.clone(), job.state.status()))
            .collect()
    }

    /// Names of the registered jobs, sorted.
    pub fn job_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.jobs.lock().keys().cloned().collect();
        names.sort();
        names
    }

    fn insert(
        &self,
        jobs: &mut HashMap<String, ActiveJob>,
        name: String,
        interval: Duration,
        handler: JobHandler,
    ) -> Registration {
        let state = Arc::new(JobState::new(name.clone(), interval));
        let job = ActiveJob::spawn(Arc::clone(&self.shared), state, handler);
        let replaced = jobs.insert(name.clone(), job).is_some();
        Registration {
            job: name,
            interval,
            replaced,
        }
    }

    /// Logs and emits a registration. Runs with the registry unlocked so
    /// listeners may call back into the scheduler.
    fn announce(&self, registration: Registration) {
        let Registration {
            job,
            interval,
            replaced,
        } = registration;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            scheduler = %self.shared.name,
            job = %job,
            interval_ms = interval.as_millis() as u64,
            replaced,
            "job registered"
        );

        self.shared
            .event_listeners
            .emit(&SchedulerEvent::JobRegistered {
                name: self.shared.name.clone(),
                timestamp: Instant::now(),
                job,
                interval,
                replaced,
            });
    }
}

struct Registration {
    job: String,
    interval: Duration,
    replaced: bool,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("name", &self.shared.name)
            .field("running", &self.is_running())
            .field("jobs", &self.job_names())
            .finish()
    }
}

/// Builder for [`Scheduler`].
pub struct SchedulerBuilder {
    name: String,
    overlap: OverlapPolicy,
    pub(crate) definitions: Vec<JobDefinition>,
    event_listeners: EventListeners<SchedulerEvent>,
}

impl SchedulerBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            name: String::from("<unnamed>"),
            overlap: OverlapPolicy::default(),
            definitions: Vec::new(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Give this scheduler a human-readable name for observability.
    ///
    /// Default: `<unnamed>`
    pub fn name<N: Into<String>>(mut self, n: N) -> Self {
        self.name = n.into();
        self
    }

    /// Sets what happens when a tick fires while the previous invocation of
    /// the same job is still running.
    ///
    /// Default: [`OverlapPolicy::Allow`]
    pub fn overlap_policy(mut self, policy: OverlapPolicy) -> Self {
        self.overlap = policy;
        self
    }

    /// Adds a job to the set registered by [`Scheduler::start`]. A later job
    /// with the same name replaces an earlier one.
    ///
    /// # Panics
    ///
    /// Panics if `interval` is zero.
    pub fn job<F, Fut, E>(mut self, name: impl Into<String>, interval: Duration, handler: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + 'static,
    {
        if interval.is_zero() {
            panic!("job interval must be greater than zero");
        }
        self.push(JobDefinition {
            name: name.into(),
            interval,
            handler: erase(handler),
        });
        self
    }

    pub(crate) fn push(&mut self, def: JobDefinition) {
        self.definitions.retain(|d| d.name != def.name);
        self.definitions.push(def);
    }

    /// Registers a callback for successful invocations, called with the job
    /// name and how long it ran.
    pub fn on_job_succeeded<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.on(move |event: &SchedulerEvent| {
            if let SchedulerEvent::JobSucceeded { job, duration, .. } = event {
                f(job, *duration);
            }
        });
        self
    }

    /// Registers a callback for failed invocations, called with the job name
    /// and the error message.
    pub fn on_job_failed<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.event_listeners.on(move |event: &SchedulerEvent| {
            if let SchedulerEvent::JobFailed { job, error, .. } = event {
                f(job, error);
            }
        });
        self
    }

    /// Registers a callback for ticks skipped under [`OverlapPolicy::Skip`].
    pub fn on_job_skipped<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.on(move |event: &SchedulerEvent| {
            if let SchedulerEvent::JobSkipped { job, .. } = event {
                f(job);
            }
        });
        self
    }

    /// Builds the scheduler. Nothing runs until [`Scheduler::start`].
    pub fn build(self) -> Scheduler {
        Scheduler {
            shared: Arc::new(Shared {
                name: self.name,
                overlap: self.overlap,
                event_listeners: self.event_listeners,
            }),
            definitions: Arc::new(self.definitions),
            jobs: Arc::new(Mutex::new(HashMap::new())),
            started: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Default for SchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
