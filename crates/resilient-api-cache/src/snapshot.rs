use serde::{Serialize, Serializer};
use std::time::Duration;

/// Read-only view of everything currently in the cache namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheSnapshot {
    /// Name of the cache instance.
    pub name: String,
    /// Number of keys in the namespace, readable or not.
    pub item_count: usize,
    /// Sum of the payload sizes, in bytes.
    pub total_size: usize,
    /// Freshness window every entry is judged by.
    #[serde(rename = "ttl_ms", serialize_with = "as_millis")]
    pub ttl: Duration,
    /// Readable entries, sorted by key.
    pub items: Vec<CacheItemInfo>,
}

/// One readable entry in a [`CacheSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheItemInfo {
    /// Cache key without the namespace prefix.
    pub key: String,
    /// Size of the payload's JSON encoding, in bytes. Record metadata is
    /// not counted.
    pub size: usize,
    /// Time left before the entry goes stale; zero once it has.
    #[serde(rename = "expires_in_ms", serialize_with = "as_millis")]
    pub expires_in: Duration,
}

impl CacheSnapshot {
    /// Entries whose freshness window has run out.
    pub fn stale_items(&self) -> impl Iterator<Item = &CacheItemInfo> {
        self.items.iter().filter(|item| item.expires_in.is_zero())
    }
}

fn as_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}
