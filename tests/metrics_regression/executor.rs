//! Executor metrics regression tests

use super::helpers::*;
use resilient_api_cache::{CacheConfig, MemoryStorage};
use resilient_api_circuitbreaker::CircuitBreaker;
use resilient_api_executor::{ApiError, ExecutorConfig, RequestSpec, ResponseOrigin};
use serde_json::{json, Value};
use serial_test::serial;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[tokio::test]
#[serial]
async fn executor_metrics_exist() {
    init_recorder();

    let down = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&down);
    let transport = tower::service_fn(move |_req: RequestSpec| {
        let down = flag.load(Ordering::SeqCst);
        async move {
            if down {
                Err(ApiError::Transport("connection refused".into()))
            } else {
                Ok::<Value, ApiError>(json!({ "ok": true }))
            }
        }
    });

    let executor = ExecutorConfig::builder()
        .name("metrics_executor")
        .breaker(CircuitBreaker::builder().failure_threshold(1).build())
        .build(transport, CacheConfig::builder().build(MemoryStorage::new()));

    let spec = RequestSpec::get("products");
    let key = spec.cache_key();

    let first = executor.execute(&spec, Some(&key), false).await.unwrap();
    assert_eq!(first.origin, ResponseOrigin::Network);
    let second = executor.execute(&spec, Some(&key), false).await.unwrap();
    assert_eq!(second.origin, ResponseOrigin::Cache);

    down.store(true, Ordering::SeqCst);
    let third = executor.execute(&spec, Some(&key), true).await.unwrap();
    assert_eq!(third.origin, ResponseOrigin::Fallback);
    let err = executor
        .execute(&RequestSpec::get("categories"), None, false)
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::ServiceUnavailable);

    assert_counter_exists("executor_calls_total");
    assert_metric_has_label("executor_calls_total", "executor", "metrics_executor");
    assert_metric_has_label("executor_calls_total", "outcome", "network");
    assert_metric_has_label("executor_calls_total", "outcome", "cache");
    assert_metric_has_label("executor_calls_total", "outcome", "fallback");
    assert_metric_has_label("executor_calls_total", "outcome", "unavailable");

    assert_histogram_exists("executor_call_duration_seconds");
    assert_metric_has_label(
        "executor_call_duration_seconds",
        "executor",
        "metrics_executor",
    );
}
