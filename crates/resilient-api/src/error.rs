use resilient_api_cache::CacheError;
use resilient_api_executor::ApiError;
use resilient_api_scheduler::SchedulerError;
use thiserror::Error;

/// Errors raised while building or starting an [`ApiClient`](crate::ApiClient).
///
/// Request failures are reported as [`ApiError`] by
/// [`ApiClient::call`](crate::ApiClient::call) instead.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The config could not be parsed.
    #[error("invalid client config: {0}")]
    InvalidConfig(#[source] serde_json::Error),

    /// The config parsed but holds a value the components reject.
    #[error("invalid client config: {0}")]
    Validation(&'static str),

    /// The HTTP transport could not be built.
    #[error("failed to build transport: {0}")]
    Transport(#[source] ApiError),

    /// The on-disk cache directory could not be opened.
    #[error("failed to open cache storage: {0}")]
    Storage(#[from] CacheError),

    /// The scheduler could not be started.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}
