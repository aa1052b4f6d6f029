use thiserror::Error;

/// Errors returned when starting the scheduler or registering a job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// Jobs run as tokio tasks and need a runtime to be spawned on.
    #[error("no tokio runtime available to run scheduled jobs")]
    NoRuntime,

    /// A job interval must be greater than zero.
    #[error("job {job} has a zero interval")]
    InvalidInterval {
        /// Name of the rejected job.
        job: String,
    },
}
