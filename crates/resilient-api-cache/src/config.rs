use crate::events::CacheEvent;
use crate::{CacheStorage, DurableCache};
use resilient_api_core::EventListeners;
use std::time::Duration;

/// How long an entry stays fresh by default: 24 hours.
pub const DEFAULT_TTL: Duration = Duration::from_millis(86_400_000);

/// Prefix put in front of every cache key in storage by default.
pub const DEFAULT_NAMESPACE: &str = "cache:";

/// Configuration for a durable cache.
pub struct CacheConfig {
    pub(crate) ttl: Duration,
    pub(crate) namespace: String,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<CacheEvent>,
}

impl CacheConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::new()
    }

    /// Freshness window of an entry.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Storage key prefix.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Name of the cache instance.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builder for configuring and constructing a [`DurableCache`].
pub struct CacheConfigBuilder {
    ttl: Duration,
    namespace: String,
    name: String,
    event_listeners: EventListeners<CacheEvent>,
}

impl CacheConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            namespace: DEFAULT_NAMESPACE.to_string(),
            name: String::from("<unnamed>"),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets how long an entry is served after it was written.
    ///
    /// Default: 24 hours
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the storage key prefix. `clear` only touches keys with this prefix.
    ///
    /// Default: `cache:`
    pub fn namespace<N: Into<String>>(mut self, namespace: N) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Give this cache a human-readable name for observability.
    ///
    /// Default: `<unnamed>`
    pub fn name<N: Into<String>>(mut self, n: N) -> Self {
        self.name = n.into();
        self
    }

    /// Registers a callback for fresh hits, called with the cache key.
    pub fn on_hit<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.on(move |event: &CacheEvent| {
            if let CacheEvent::Hit { key, .. } = event {
                f(key);
            }
        });
        self
    }

    /// Registers a callback for lookups that found nothing.
    pub fn on_miss<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.on(move |event: &CacheEvent| {
            if let CacheEvent::Miss { key, .. } = event {
                f(key);
            }
        });
        self
    }

    /// Registers a callback for entries dropped because they outlived the TTL.
    pub fn on_expired<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.on(move |event: &CacheEvent| {
            if let CacheEvent::Expired { key, .. } = event {
                f(key);
            }
        });
        self
    }

    /// Registers a callback for unreadable records.
    pub fn on_corrupt<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.on(move |event: &CacheEvent| {
            if let CacheEvent::Corrupt { key, .. } = event {
                f(key);
            }
        });
        self
    }

    /// Registers a callback for successful writes.
    pub fn on_store<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.on(move |event: &CacheEvent| {
            if let CacheEvent::Stored { key, .. } = event {
                f(key);
            }
        });
        self
    }

    pub(crate) fn into_config(self) -> CacheConfig {
        if self.ttl.is_zero() {
            panic!("ttl must be greater than zero");
        }

        CacheConfig {
            ttl: self.ttl,
            namespace: self.namespace,
            name: self.name,
            event_listeners: self.event_listeners,
        }
    }

    /// Builds a cache over the given storage.
    ///
    /// # Panics
    ///
    /// Panics if `ttl` is zero.
    pub fn build<S: CacheStorage>(self, storage: S) -> DurableCache<S> {
        DurableCache::new(storage, self.into_config())
    }
}

impl Default for CacheConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
