use resilient_api_cache::{CacheError, CacheStorage, FileStorage, MemoryStorage};

/// Cache backend chosen by [`ClientConfig::cache_dir`](crate::ClientConfig).
#[derive(Debug)]
pub enum ClientStorage {
    /// Records live in process memory.
    Memory(MemoryStorage),
    /// Records are JSON files in a directory and survive restarts.
    File(FileStorage),
}

impl CacheStorage for ClientStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        match self {
            ClientStorage::Memory(s) => s.get(key).await,
            ClientStorage::File(s) => s.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        match self {
            ClientStorage::Memory(s) => s.set(key, value).await,
            ClientStorage::File(s) => s.set(key, value).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        match self {
            ClientStorage::Memory(s) => s.delete(key).await,
            ClientStorage::File(s) => s.delete(key).await,
        }
    }

    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        match self {
            ClientStorage::Memory(s) => s.keys().await,
            ClientStorage::File(s) => s.keys().await,
        }
    }
}
