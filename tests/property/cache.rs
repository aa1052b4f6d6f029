//! Property tests for cache freshness.
//!
//! Invariants tested:
//! - An entry is fresh iff its age is below the TTL
//! - Time left plus age equals the TTL while fresh
//! - Stale reads return whatever was last written, whatever its age

use proptest::prelude::*;
use resilient_api_cache::{CacheConfig, CacheEntry, CacheStorage, MemoryStorage};
use resilient_api_core::time::now_millis;
use serde_json::{json, Value};
use std::time::Duration;

fn entry(stored_at: u64) -> CacheEntry {
    CacheEntry {
        key: "k".into(),
        payload: Value::Null,
        stored_at,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: freshness is exactly `age < ttl`
    #[test]
    fn fresh_iff_age_below_ttl(
        stored_at in 0u64..1_000_000_000,
        age in 0u64..200_000_000,
        ttl_ms in 1u64..100_000_000,
    ) {
        let now = stored_at + age;
        let ttl = Duration::from_millis(ttl_ms);
        let e = entry(stored_at);

        prop_assert_eq!(e.is_fresh_at(now, ttl), age < ttl_ms);
        if age < ttl_ms {
            prop_assert_eq!(e.expires_in_at(now, ttl) + e.age_at(now), ttl);
        }
        prop_assert_eq!(e.expires_in_at(now, ttl).is_zero(), !e.is_fresh_at(now, ttl));
    }

    /// Property: entries written in the future are treated as brand new
    #[test]
    fn future_writes_have_zero_age(now in 0u64..1_000_000, ahead in 1u64..1_000_000) {
        let e = entry(now + ahead);
        prop_assert_eq!(e.age_at(now), Duration::ZERO);
        prop_assert!(e.is_fresh_at(now, Duration::from_millis(1)));
    }

    /// Property: stale reads see the last write regardless of age
    #[test]
    fn stale_read_returns_last_write(age_hours in 0u64..500, n in any::<i32>()) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async {
            let storage = MemoryStorage::new();
            let cache = CacheConfig::builder().build(storage.clone());
            let stored_at = now_millis() - age_hours * 60 * 60 * 1000;
            storage
                .set(
                    "cache:k",
                    json!({ "data": n, "timestamp": stored_at }).to_string(),
                )
                .await
                .unwrap();

            let entry = cache.get_stale("k").await.unwrap();
            prop_assert_eq!(entry.payload, json!(n));
            prop_assert_eq!(entry.stored_at, stored_at);

            let fresh = cache.get("k").await.is_some();
            prop_assert_eq!(fresh, age_hours < 24);
            Ok(())
        })?;
    }
}
