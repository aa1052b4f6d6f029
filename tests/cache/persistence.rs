use resilient_api_cache::{CacheConfig, CacheStorage, DurableCache, FileStorage};
use serde_json::json;
use std::path::Path;

async fn open(dir: &Path) -> DurableCache<FileStorage> {
    let storage = FileStorage::open(dir).await.unwrap();
    CacheConfig::builder().name("disk").build(storage)
}

#[tokio::test]
async fn entries_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();

    let stored_at = {
        let cache = open(dir.path()).await;
        cache.set("GET products?page=0&size=8", &json!([{ "id": 1 }])).await;
        cache.get("GET products?page=0&size=8").await.unwrap().stored_at
    };

    let reopened = open(dir.path()).await;
    let entry = reopened.get("GET products?page=0&size=8").await.unwrap();
    assert_eq!(entry.payload, json!([{ "id": 1 }]));
    assert_eq!(entry.stored_at, stored_at);
}

#[tokio::test]
async fn keys_with_path_characters_are_safe() {
    let dir = tempfile::tempdir().unwrap();
    let cache = open(dir.path()).await;
    let key = "GET products/search?title=../../etc/passwd";

    cache.set(key, &json!("ok")).await;
    assert_eq!(cache.get(key).await.unwrap().payload, json!("ok"));

    let keys = cache.storage().keys().await.unwrap();
    assert_eq!(keys, vec![format!("cache:{}", key)]);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn clear_removes_files_in_namespace_only() {
    let dir = tempfile::tempdir().unwrap();
    let cache = open(dir.path()).await;
    cache.set("a", &json!(1)).await;
    cache.set("b", &json!(2)).await;
    cache
        .storage()
        .set("session:token", "\"abc\"".to_string())
        .await
        .unwrap();

    assert_eq!(cache.clear().await, 2);
    assert_eq!(
        cache.storage().keys().await.unwrap(),
        vec!["session:token".to_string()]
    );
}

#[tokio::test]
async fn delete_of_missing_entry_is_fine() {
    let dir = tempfile::tempdir().unwrap();
    let cache = open(dir.path()).await;
    cache.delete("never-stored").await;
    assert!(cache.get("never-stored").await.is_none());
}

#[tokio::test]
async fn open_creates_nested_directories() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("a").join("b");
    let storage = FileStorage::open(&nested).await.unwrap();
    assert!(nested.is_dir());
    assert_eq!(storage.dir(), nested.as_path());
}
