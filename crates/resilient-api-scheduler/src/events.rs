use resilient_api_core::ResilienceEvent;
use std::time::{Duration, Instant};

/// Events emitted by the scheduler.
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    /// A job was registered, replacing any job with the same name.
    JobRegistered {
        name: String,
        timestamp: Instant,
        job: String,
        interval: Duration,
        replaced: bool,
    },
    /// A job invocation finished successfully.
    JobSucceeded {
        name: String,
        timestamp: Instant,
        job: String,
        duration: Duration,
    },
    /// A job invocation returned an error or panicked.
    JobFailed {
        name: String,
        timestamp: Instant,
        job: String,
        error: String,
        duration: Duration,
    },
    /// A tick was skipped because the previous invocation was still running.
    JobSkipped {
        name: String,
        timestamp: Instant,
        job: String,
    },
}

impl SchedulerEvent {
    /// Name of the job the event is about.
    pub fn job(&self) -> &str {
        match self {
            SchedulerEvent::JobRegistered { job, .. }
            | SchedulerEvent::JobSucceeded { job, .. }
            | SchedulerEvent::JobFailed { job, .. }
            | SchedulerEvent::JobSkipped { job, .. } => job,
        }
    }
}

impl ResilienceEvent for SchedulerEvent {
    const COMPONENT: &'static str = "scheduler";

    fn event_type(&self) -> &'static str {
        match self {
            SchedulerEvent::JobRegistered { .. } => "job_registered",
            SchedulerEvent::JobSucceeded { .. } => "job_succeeded",
            SchedulerEvent::JobFailed { .. } => "job_failed",
            SchedulerEvent::JobSkipped { .. } => "job_skipped",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            SchedulerEvent::JobRegistered { timestamp, .. }
            | SchedulerEvent::JobSucceeded { timestamp, .. }
            | SchedulerEvent::JobFailed { timestamp, .. }
            | SchedulerEvent::JobSkipped { timestamp, .. } => *timestamp,
        }
    }

    fn source_name(&self) -> &str {
        match self {
            SchedulerEvent::JobRegistered { name, .. }
            | SchedulerEvent::JobSucceeded { name, .. }
            | SchedulerEvent::JobFailed { name, .. }
            | SchedulerEvent::JobSkipped { name, .. } => name,
        }
    }
}
