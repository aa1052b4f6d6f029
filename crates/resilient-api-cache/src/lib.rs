//! Durable TTL cache for remote API responses.
//!
//! Successful responses are kept under a stable key together with the time
//! they were written. A lookup only returns an entry while it is fresh, that
//! is while `now - stored_at < ttl`; a stale entry is deleted when it is read.
//! Nothing sweeps the cache in the background.
//!
//! Entries are persisted through a [`CacheStorage`] backend as JSON records of
//! the form `{"data": <payload>, "timestamp": <epoch ms>}`, under keys prefixed
//! with a namespace (`cache:` by default). Two backends ship with the crate:
//! [`MemoryStorage`] and [`FileStorage`].
//!
//! The cache never fails its callers. Unreadable records and storage errors
//! are logged and reported as misses; failed writes are logged and dropped.
//!
//! # Examples
//!
//! ```
//! use resilient_api_cache::{CacheConfig, MemoryStorage};
//! use serde_json::json;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let cache = CacheConfig::builder()
//!     .name("storefront")
//!     .ttl(Duration::from_secs(60 * 60))
//!     .on_miss(|key| println!("miss: {}", key))
//!     .build(MemoryStorage::new());
//!
//! cache.set("categories", &json!(["books", "games"])).await;
//! let entry = cache.get("categories").await.unwrap();
//! assert_eq!(entry.payload, json!(["books", "games"]));
//! # }
//! ```
//!
//! # Feature Flags
//! - `metrics`: lookup and write counters via the `metrics` crate
//! - `tracing`: structured logs via the `tracing` crate

use resilient_api_core::time::{from_unix_millis, now_millis};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant, SystemTime};

#[cfg(feature = "metrics")]
use metrics::counter;

pub use config::{CacheConfig, CacheConfigBuilder, DEFAULT_NAMESPACE, DEFAULT_TTL};
pub use error::CacheError;
pub use events::CacheEvent;
pub use snapshot::{CacheItemInfo, CacheSnapshot};
pub use storage::{CacheStorage, FileStorage, MemoryStorage};

mod config;
mod error;
mod events;
mod snapshot;
mod storage;

/// A cached payload and the time it was written.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Cache key, without the namespace prefix.
    pub key: String,
    /// The last successfully retrieved response.
    pub payload: Value,
    /// Write time in milliseconds since the Unix epoch.
    pub stored_at: u64,
}

impl CacheEntry {
    /// Write time as a `SystemTime`.
    pub fn stored_at_time(&self) -> SystemTime {
        from_unix_millis(self.stored_at)
    }

    /// Age of the entry at `now_ms`. Writes from the future have age zero.
    pub fn age_at(&self, now_ms: u64) -> Duration {
        Duration::from_millis(now_ms.saturating_sub(self.stored_at))
    }

    /// Whether the entry is still fresh at `now_ms`.
    pub fn is_fresh_at(&self, now_ms: u64, ttl: Duration) -> bool {
        self.age_at(now_ms) < ttl
    }

    /// Time left before the entry goes stale at `now_ms`, saturating at zero.
    pub fn expires_in_at(&self, now_ms: u64, ttl: Duration) -> Duration {
        ttl.saturating_sub(self.age_at(now_ms))
    }
}

#[derive(Serialize)]
struct RecordRef<'a> {
    data: &'a Value,
    timestamp: u64,
}

#[derive(Deserialize)]
struct Record {
    data: Value,
    timestamp: u64,
}

enum Lookup {
    Found(CacheEntry),
    Absent,
    Unreadable,
}

/// TTL cache over a [`CacheStorage`] backend.
///
/// Build one with [`CacheConfig::builder`].
pub struct DurableCache<S> {
    storage: S,
    config: CacheConfig,
}

impl<S: CacheStorage> DurableCache<S> {
    /// Creates a cache from a finished configuration.
    pub fn new(storage: S, config: CacheConfig) -> Self {
        Self { storage, config }
    }

    /// Returns a new configuration builder.
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::new()
    }

    /// The configuration this cache was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Freshness window.
    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }

    /// The storage backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Returns the entry for `key` if it is fresh.
    ///
    /// A stale entry is deleted and reported as a miss. Unreadable records are
    /// misses too but are left in place.
    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        match self.load(key).await {
            Lookup::Found(entry) => {
                let now = now_millis();
                if entry.is_fresh_at(now, self.config.ttl) {
                    self.record("hit");
                    self.emit_hit(key);
                    Some(entry)
                } else {
                    self.record("expired");
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        cache = %self.config.name,
                        key,
                        age_ms = now.saturating_sub(entry.stored_at),
                        "cache entry expired"
                    );
                    self.remove(key).await;
                    self.config.event_listeners.emit(&CacheEvent::Expired {
                        name: self.config.name.clone(),
                        timestamp: Instant::now(),
                        key: key.to_string(),
                    });
                    None
                }
            }
            Lookup::Absent => {
                self.record("miss");
                self.config.event_listeners.emit(&CacheEvent::Miss {
                    name: self.config.name.clone(),
                    timestamp: Instant::now(),
                    key: key.to_string(),
                });
                None
            }
            Lookup::Unreadable => None,
        }
    }

    /// Returns the entry for `key` regardless of its age. Never deletes.
    pub async fn get_stale(&self, key: &str) -> Option<CacheEntry> {
        match self.load(key).await {
            Lookup::Found(entry) => {
                self.record("stale");
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    cache = %self.config.name,
                    key,
                    stored_at = entry.stored_at,
                    "serving cache entry ignoring freshness"
                );
                Some(entry)
            }
            Lookup::Absent => {
                self.record("miss");
                None
            }
            Lookup::Unreadable => None,
        }
    }

    /// Stores `payload` under `key` stamped with the current time, replacing
    /// any previous entry. Failures are logged, never returned.
    pub async fn set(&self, key: &str, payload: &Value) {
        let record = RecordRef {
            data: payload,
            timestamp: now_millis(),
        };
        let raw = match serde_json::to_string(&record).map_err(CacheError::Encode) {
            Ok(raw) => raw,
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(cache = %self.config.name, key, error = %_e, "failed to encode cache entry");
                return;
            }
        };

        match self.storage.set(&self.storage_key(key), raw).await {
            Ok(()) => {
                #[cfg(feature = "metrics")]
                counter!("cache_writes_total", "cache" => self.config.name.clone()).increment(1);

                self.config.event_listeners.emit(&CacheEvent::Stored {
                    name: self.config.name.clone(),
                    timestamp: Instant::now(),
                    key: key.to_string(),
                });
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(cache = %self.config.name, key, error = %_e, "failed to write cache entry");
            }
        }
    }

    /// Removes the entry for `key`.
    pub async fn delete(&self, key: &str) {
        self.remove(key).await;
    }

    /// Removes every entry in the cache namespace and returns how many were
    /// removed. Keys outside the namespace are untouched.
    pub async fn clear(&self) -> usize {
        let keys = match self.storage.keys().await {
            Ok(keys) => keys,
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(cache = %self.config.name, error = %_e, "failed to list cache keys");
                return 0;
            }
        };

        let mut removed = 0;
        for storage_key in keys
            .iter()
            .filter(|k| k.starts_with(self.config.namespace.as_str()))
        {
            match self.storage.delete(storage_key).await {
                Ok(()) => removed += 1,
                Err(_e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(cache = %self.config.name, key = %storage_key, error = %_e, "failed to delete cache entry");
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::info!(cache = %self.config.name, removed, "cache cleared");

        removed
    }

    /// Describes the cache contents without modifying anything.
    ///
    /// `item_count` counts every key in the namespace; `items` only lists the
    /// records that could be read and decoded.
    pub async fn snapshot(&self) -> CacheSnapshot {
        let now = now_millis();
        let mut snapshot = CacheSnapshot {
            name: self.config.name.clone(),
            item_count: 0,
            total_size: 0,
            ttl: self.config.ttl,
            items: Vec::new(),
        };

        let keys = match self.storage.keys().await {
            Ok(keys) => keys,
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(cache = %self.config.name, error = %_e, "failed to list cache keys");
                return snapshot;
            }
        };

        for storage_key in keys {
            let Some(key) = storage_key.strip_prefix(self.config.namespace.as_str()) else {
                continue;
            };
            snapshot.item_count += 1;

            let Ok(Some(raw)) = self.storage.get(&storage_key).await else {
                continue;
            };
            let Ok(record) = serde_json::from_str::<Record>(&raw) else {
                continue;
            };

            let size = payload_size(&record.data);
            let entry = CacheEntry {
                key: key.to_string(),
                payload: record.data,
                stored_at: record.timestamp,
            };
            snapshot.total_size += size;
            snapshot.items.push(CacheItemInfo {
                key: entry.key.clone(),
                size,
                expires_in: entry.expires_in_at(now, self.config.ttl),
            });
        }

        snapshot.items.sort_by(|a, b| a.key.cmp(&b.key));
        snapshot
    }

    fn storage_key(&self, key: &str) -> String {
        format!("{}{}", self.config.namespace, key)
    }

    async fn load(&self, key: &str) -> Lookup {
        let raw = match self.storage.get(&self.storage_key(key)).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Lookup::Absent,
            Err(e) => {
                self.report_unreadable(key, &e);
                return Lookup::Unreadable;
            }
        };

        match serde_json::from_str::<Record>(&raw) {
            Ok(record) => Lookup::Found(CacheEntry {
                key: key.to_string(),
                payload: record.data,
                stored_at: record.timestamp,
            }),
            Err(source) => {
                let e = CacheError::Corrupt {
                    key: self.storage_key(key),
                    source,
                };
                self.report_unreadable(key, &e);
                Lookup::Unreadable
            }
        }
    }

    fn report_unreadable(&self, key: &str, _error: &CacheError) {
        self.record("corrupt");

        #[cfg(feature = "tracing")]
        tracing::warn!(cache = %self.config.name, key, error = %_error, "unreadable cache entry treated as miss");

        self.config.event_listeners.emit(&CacheEvent::Corrupt {
            name: self.config.name.clone(),
            timestamp: Instant::now(),
            key: key.to_string(),
        });
    }

    async fn remove(&self, key: &str) {
        if let Err(_e) = self.storage.delete(&self.storage_key(key)).await {
            #[cfg(feature = "tracing")]
            tracing::warn!(cache = %self.config.name, key, error = %_e, "failed to delete cache entry");
        }
    }

    fn emit_hit(&self, key: &str) {
        #[cfg(feature = "tracing")]
        tracing::trace!(cache = %self.config.name, key, "cache hit");

        self.config.event_listeners.emit(&CacheEvent::Hit {
            name: self.config.name.clone(),
            timestamp: Instant::now(),
            key: key.to_string(),
        });
    }

    #[allow(unused_variables)]
    fn record(&self, result: &'static str) {
        #[cfg(feature = "metrics")]
        counter!(
            "cache_requests_total",
            "cache" => self.config.name.clone(),
            "result" => result
        )
        .increment(1);
    }
}

/// Length of the payload's compact JSON encoding.
fn payload_size(payload: &Value) -> usize {
    serde_json::to_string(payload).map_or(0, |s| s.len())
}

impl<S> std::fmt::Debug for DurableCache<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableCache")
            .field("name", &self.config.name)
            .field("namespace", &self.config.namespace)
            .field("ttl", &self.config.ttl)
            .finish()
    }
}
