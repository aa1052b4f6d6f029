use crate::{ApiError, ResponseOrigin};
use resilient_api_core::ResilienceEvent;
use std::time::{Duration, Instant};

/// Events emitted by the executor, one per `execute` call.
#[derive(Debug, Clone)]
pub enum ExecutorEvent {
    /// The call produced a payload.
    CallSucceeded {
        name: String,
        timestamp: Instant,
        /// `METHOD /path` of the request.
        request: String,
        origin: ResponseOrigin,
        duration: Duration,
    },
    /// The call failed and nothing was cached to fall back to.
    CallFailed {
        name: String,
        timestamp: Instant,
        request: String,
        error: ApiError,
        duration: Duration,
    },
}

impl ExecutorEvent {
    /// Wall time the call took.
    pub fn duration(&self) -> Duration {
        match self {
            ExecutorEvent::CallSucceeded { duration, .. }
            | ExecutorEvent::CallFailed { duration, .. } => *duration,
        }
    }
}

impl ResilienceEvent for ExecutorEvent {
    const COMPONENT: &'static str = "executor";

    fn event_type(&self) -> &'static str {
        match self {
            ExecutorEvent::CallSucceeded { .. } => "call_succeeded",
            ExecutorEvent::CallFailed { .. } => "call_failed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            ExecutorEvent::CallSucceeded { timestamp, .. }
            | ExecutorEvent::CallFailed { timestamp, .. } => *timestamp,
        }
    }

    fn source_name(&self) -> &str {
        match self {
            ExecutorEvent::CallSucceeded { name, .. } | ExecutorEvent::CallFailed { name, .. } => {
                name
            }
        }
    }
}
