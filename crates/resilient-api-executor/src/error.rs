use thiserror::Error;

/// Errors returned by [`ResilientExecutor::execute`](crate::ResilientExecutor::execute).
///
/// Every variant except [`ServiceUnavailable`](ApiError::ServiceUnavailable)
/// counts as one failure toward the circuit breaker threshold; the kind of
/// failure makes no difference there.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request never produced a response: connect error, timeout, reset.
    #[error("transport error: {0}")]
    Transport(String),

    /// The upstream answered with a non-2xx status.
    #[error("remote error {status}: {message}")]
    Remote {
        /// HTTP status code.
        status: u16,
        /// Message from the response body, or the status reason.
        message: String,
    },

    /// The response body was not valid JSON.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The circuit is open and nothing was cached to fall back to.
    #[error("service temporarily unavailable, try again shortly")]
    ServiceUnavailable,
}

impl ApiError {
    /// Whether retrying later may succeed without any change on the caller's
    /// side.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::ServiceUnavailable | ApiError::Transport(_))
    }

    /// HTTP status of a remote error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Transport(_) => "transport",
            ApiError::Remote { .. } => "remote",
            ApiError::Decode(_) => "decode",
            ApiError::ServiceUnavailable => "unavailable",
        }
    }
}
