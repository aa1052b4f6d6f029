//! Error types for the durable cache.
//!
//! These errors exist for storage backends and diagnostics. The
//! [`DurableCache`](crate::DurableCache) itself never returns them: every
//! storage failure is logged and reported to callers as a cache miss.

use thiserror::Error;

/// Errors raised while reading or writing the storage medium.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The storage medium could not be read or written.
    #[error("cache storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A stored record exists but could not be decoded.
    #[error("corrupt cache record for {key}: {source}")]
    Corrupt {
        /// Storage key of the unreadable record.
        key: String,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },

    /// A payload could not be serialized for storage.
    #[error("failed to encode cache record: {0}")]
    Encode(#[source] serde_json::Error),
}

impl CacheError {
    /// Returns true for unreadable records.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, CacheError::Corrupt { .. })
    }
}
