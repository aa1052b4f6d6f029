//! Storage backends for the durable cache.
//!
//! The cache stores opaque string records under string keys. A backend only
//! has to get, set, delete and list them; freshness and record encoding are
//! handled by [`DurableCache`](crate::DurableCache).

use crate::CacheError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const RECORD_EXTENSION: &str = "json";

/// Minimal async key/value store backing a [`DurableCache`](crate::DurableCache).
///
/// # Examples
///
/// ```rust
/// use resilient_api_cache::{CacheError, CacheStorage};
///
/// struct Discard;
///
/// impl CacheStorage for Discard {
///     async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
///         Ok(None)
///     }
///     async fn set(&self, _key: &str, _value: String) -> Result<(), CacheError> {
///         Ok(())
///     }
///     async fn delete(&self, _key: &str) -> Result<(), CacheError> {
///         Ok(())
///     }
///     async fn keys(&self) -> Result<Vec<String>, CacheError> {
///         Ok(Vec::new())
///     }
/// }
/// ```
pub trait CacheStorage: Send + Sync + 'static {
    /// Reads the record stored under `key`, or `None` when absent.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, CacheError>> + Send;

    /// Stores `value` under `key`, replacing any previous record.
    fn set(&self, key: &str, value: String) -> impl Future<Output = Result<(), CacheError>> + Send;

    /// Removes the record under `key`. Removing an absent key succeeds.
    fn delete(&self, key: &str) -> impl Future<Output = Result<(), CacheError>> + Send;

    /// Lists every key currently stored, in no particular order.
    fn keys(&self) -> impl Future<Output = Result<Vec<String>, CacheError>> + Send;
}

/// In-process storage. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    records: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, in any namespace.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns true when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl CacheStorage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.records.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        self.records.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.records.lock().remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        Ok(self.records.lock().keys().cloned().collect())
    }
}

/// Directory-backed storage: one file per key.
///
/// File names are the hex encoding of the key plus a `.json` extension, so any
/// key is a valid file name. Writes go to a temporary file that is renamed into
/// place, so readers never observe a half-written record. Records survive
/// process restarts.
#[derive(Debug)]
pub struct FileStorage {
    dir: PathBuf,
    write_seq: AtomicU64,
}

impl FileStorage {
    /// Opens (creating if needed) a storage directory.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            write_seq: AtomicU64::new(0),
        })
    }

    /// The directory records are stored in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", hex::encode(key), RECORD_EXTENSION))
    }
}

fn key_from_file_name(name: &str) -> Option<String> {
    let stem = name.strip_suffix(RECORD_EXTENSION)?.strip_suffix('.')?;
    let bytes = hex::decode(stem).ok()?;
    String::from_utf8(bytes).ok()
}

impl CacheStorage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        let target = self.path_for(key);
        let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
        let tmp = self
            .dir
            .join(format!("{}.{}.tmp", hex::encode(key), seq));

        let written = match tokio::fs::write(&tmp, value).await {
            Ok(()) => tokio::fs::rename(&tmp, &target).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            // a failed write may leave a partial temp file behind
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        let mut keys = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if let Some(key) = entry.file_name().to_str().and_then(key_from_file_name) {
                keys.push(key);
            }
        }
        Ok(keys)
    }
}
