use resilient_api_cache::{CacheConfig, CacheStorage, DurableCache, MemoryStorage};
use resilient_api_core::time::now_millis;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const HOUR: u64 = 60 * 60 * 1000;

fn cache(storage: &MemoryStorage) -> DurableCache<MemoryStorage> {
    CacheConfig::builder()
        .name("ttl")
        .ttl(Duration::from_millis(24 * HOUR))
        .build(storage.clone())
}

async fn seed(storage: &MemoryStorage, key: &str, age_ms: u64) {
    let record = json!({ "data": { "seeded": key }, "timestamp": now_millis() - age_ms });
    storage
        .set(&format!("cache:{}", key), record.to_string())
        .await
        .unwrap();
}

#[tokio::test]
async fn fresh_entry_is_returned_with_its_timestamp() {
    let storage = MemoryStorage::new();
    let cache = cache(&storage);
    let before = now_millis();

    cache.set("products?page=0", &json!([1, 2, 3])).await;
    let entry = cache.get("products?page=0").await.unwrap();

    assert_eq!(entry.key, "products?page=0");
    assert_eq!(entry.payload, json!([1, 2, 3]));
    assert!(entry.stored_at >= before);
    assert!(entry.stored_at <= now_millis());
}

#[tokio::test]
async fn entry_just_inside_ttl_is_fresh() {
    let storage = MemoryStorage::new();
    let cache = cache(&storage);
    seed(&storage, "categories", 23 * HOUR).await;

    assert!(cache.get("categories").await.is_some());
}

#[tokio::test]
async fn expired_entry_is_a_miss_and_is_deleted() {
    let storage = MemoryStorage::new();
    let cache = cache(&storage);
    seed(&storage, "categories", 25 * HOUR).await;

    assert!(cache.get("categories").await.is_none());
    assert_eq!(storage.get("cache:categories").await.unwrap(), None);
    assert!(cache.get_stale("categories").await.is_none());
}

#[tokio::test]
async fn stale_read_ignores_age_and_keeps_the_entry() {
    let storage = MemoryStorage::new();
    let cache = cache(&storage);
    seed(&storage, "products", 48 * HOUR).await;

    let entry = cache.get_stale("products").await.unwrap();
    assert_eq!(entry.payload, json!({ "seeded": "products" }));
    assert!(storage.get("cache:products").await.unwrap().is_some());
}

#[tokio::test]
async fn set_overwrites_and_restamps() {
    let storage = MemoryStorage::new();
    let cache = cache(&storage);
    seed(&storage, "products", 48 * HOUR).await;

    cache.set("products", &json!("new")).await;
    let entry = cache.get("products").await.unwrap();
    assert_eq!(entry.payload, json!("new"));
    assert!(now_millis() - entry.stored_at < HOUR);
}

#[tokio::test]
async fn records_use_the_documented_layout() {
    let storage = MemoryStorage::new();
    let cache = cache(&storage);
    cache.set("categories", &json!(["a"])).await;

    let raw = storage.get("cache:categories").await.unwrap().unwrap();
    let record: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(record["data"], json!(["a"]));
    assert!(record["timestamp"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn custom_namespace_is_respected() {
    let storage = MemoryStorage::new();
    let cache = CacheConfig::builder()
        .namespace("shop:")
        .build(storage.clone());

    cache.set("categories", &json!([])).await;
    assert_eq!(storage.keys().await.unwrap(), vec!["shop:categories".to_string()]);
}

#[tokio::test]
async fn snapshot_reports_stale_entries_without_deleting() {
    let storage = MemoryStorage::new();
    let cache = cache(&storage);
    seed(&storage, "old", 30 * HOUR).await;
    cache.set("new", &json!({ "n": 1 })).await;

    let snap = cache.snapshot().await;
    assert_eq!(snap.item_count, 2);
    assert_eq!(snap.ttl, Duration::from_millis(24 * HOUR));
    let stale: Vec<_> = snap.stale_items().map(|i| i.key.as_str()).collect();
    assert_eq!(stale, vec!["old"]);
    // payload bytes only: {"n":1} and {"seeded":"old"}
    let sizes: Vec<_> = snap.items.iter().map(|i| (i.key.as_str(), i.size)).collect();
    assert_eq!(sizes, vec![("new", 7), ("old", 16)]);
    assert_eq!(snap.total_size, 23);

    assert_eq!(storage.len(), 2);
    assert_eq!(cache.snapshot().await.item_count, 2);
}

#[tokio::test]
async fn callbacks_follow_lookups() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (hit, miss, expired, stored) = (log.clone(), log.clone(), log.clone(), log.clone());
    let storage = MemoryStorage::new();
    let cache = CacheConfig::builder()
        .on_hit(move |k| hit.lock().unwrap().push(format!("hit {}", k)))
        .on_miss(move |k| miss.lock().unwrap().push(format!("miss {}", k)))
        .on_expired(move |k| expired.lock().unwrap().push(format!("expired {}", k)))
        .on_store(move |k| stored.lock().unwrap().push(format!("store {}", k)))
        .build(storage.clone());
    seed(&storage, "old", 25 * HOUR).await;

    cache.get("a").await;
    cache.set("a", &json!(1)).await;
    cache.get("a").await;
    cache.get("old").await;

    assert_eq!(
        *log.lock().unwrap(),
        vec!["miss a", "store a", "hit a", "expired old"]
    );
}
