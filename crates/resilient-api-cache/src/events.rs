//! Event types for the durable cache.

use resilient_api_core::ResilienceEvent;
use std::time::Instant;

/// Events emitted by the durable cache.
#[derive(Debug, Clone)]
pub enum CacheEvent {
    /// A fresh entry was served.
    Hit {
        /// The name of the cache instance.
        name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Cache key that was looked up.
        key: String,
    },
    /// No entry exists for the key.
    Miss {
        /// The name of the cache instance.
        name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Cache key that was looked up.
        key: String,
    },
    /// An entry was older than the TTL and was deleted on read.
    Expired {
        /// The name of the cache instance.
        name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Cache key of the expired entry.
        key: String,
    },
    /// A record could not be read or decoded and was treated as a miss.
    Corrupt {
        /// The name of the cache instance.
        name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Cache key of the unreadable record.
        key: String,
    },
    /// A payload was written.
    Stored {
        /// The name of the cache instance.
        name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Cache key that was written.
        key: String,
    },
}

impl CacheEvent {
    /// Cache key the event is about.
    pub fn key(&self) -> &str {
        match self {
            CacheEvent::Hit { key, .. }
            | CacheEvent::Miss { key, .. }
            | CacheEvent::Expired { key, .. }
            | CacheEvent::Corrupt { key, .. }
            | CacheEvent::Stored { key, .. } => key,
        }
    }
}

impl ResilienceEvent for CacheEvent {
    const COMPONENT: &'static str = "cache";

    fn event_type(&self) -> &'static str {
        match self {
            CacheEvent::Hit { .. } => "cache_hit",
            CacheEvent::Miss { .. } => "cache_miss",
            CacheEvent::Expired { .. } => "cache_expired",
            CacheEvent::Corrupt { .. } => "cache_corrupt",
            CacheEvent::Stored { .. } => "cache_stored",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CacheEvent::Hit { timestamp, .. }
            | CacheEvent::Miss { timestamp, .. }
            | CacheEvent::Expired { timestamp, .. }
            | CacheEvent::Corrupt { timestamp, .. }
            | CacheEvent::Stored { timestamp, .. } => *timestamp,
        }
    }

    fn source_name(&self) -> &str {
        match self {
            CacheEvent::Hit { name, .. }
            | CacheEvent::Miss { name, .. }
            | CacheEvent::Expired { name, .. }
            | CacheEvent::Corrupt { name, .. }
            | CacheEvent::Stored { name, .. } => name,
        }
    }
}
