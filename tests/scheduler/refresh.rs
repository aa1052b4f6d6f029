use crate::common::Upstream;
use resilient_api_cache::{CacheConfig, MemoryStorage};
use resilient_api_circuitbreaker::{CircuitBreaker, CircuitState};
use resilient_api_executor::{ExecutorConfig, RequestSpec, ResilientExecutor};
use resilient_api_scheduler::{
    RefreshPlan, Scheduler, POLL_HEALTH, REFRESH_CATEGORIES, REFRESH_PRODUCTS,
};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

const PRODUCTS: &str = "GET products?page=0&size=8";
const CATEGORIES: &str = "GET categories";
const PROBE: &str = "GET products?page=0&size=1";

fn executor(upstream: &Upstream) -> Arc<ResilientExecutor<Upstream>> {
    Arc::new(
        ExecutorConfig::builder()
            .name("storefront")
            .breaker(
                CircuitBreaker::builder()
                    .failure_threshold(3)
                    .reset_timeout(Duration::from_secs(30))
                    .build(),
            )
            .build(
                upstream.clone(),
                CacheConfig::builder().build(MemoryStorage::new()),
            ),
    )
}

fn plan() -> RefreshPlan {
    RefreshPlan {
        products_interval: Duration::from_secs(60),
        categories_interval: Duration::from_secs(360),
        health_interval: Duration::from_secs(120),
        ..RefreshPlan::default()
    }
}

#[tokio::test(start_paused = true)]
async fn start_warms_the_cache_immediately() {
    let upstream = Upstream::new();
    let executor = executor(&upstream);
    let scheduler = Scheduler::builder()
        .refresh(Arc::clone(&executor), RefreshPlan::default())
        .build();

    scheduler.start().unwrap();
    sleep(Duration::from_millis(1)).await;

    let mut seen = upstream.seen();
    seen.sort();
    assert_eq!(seen, vec![CATEGORIES, PROBE, PRODUCTS]);

    let cached: Vec<_> = executor
        .cache_snapshot()
        .await
        .items
        .into_iter()
        .map(|item| item.key)
        .collect();
    assert_eq!(cached, vec![CATEGORIES, PRODUCTS]);

    assert_eq!(
        scheduler.job_names(),
        vec![POLL_HEALTH, REFRESH_CATEGORIES, REFRESH_PRODUCTS]
    );
}

#[tokio::test(start_paused = true)]
async fn refresh_rewrites_entries_that_are_still_fresh() {
    let upstream = Upstream::new();
    let executor = executor(&upstream);
    let scheduler = Scheduler::builder()
        .refresh(Arc::clone(&executor), plan())
        .build();

    scheduler.start().unwrap();
    sleep(Duration::from_millis(1)).await;
    let first = executor.cache().get(PRODUCTS).await.unwrap().payload;

    sleep(Duration::from_secs(60)).await;
    let second = executor.cache().get(PRODUCTS).await.unwrap().payload;

    assert_ne!(first, second);
    assert_eq!(upstream.seen().iter().filter(|k| *k == PRODUCTS).count(), 2);
    assert_eq!(upstream.seen().iter().filter(|k| *k == CATEGORIES).count(), 1);
}

#[tokio::test(start_paused = true)]
async fn degraded_refresh_is_a_job_failure_and_keeps_the_entry() {
    let upstream = Upstream::new();
    let executor = executor(&upstream);
    let failures = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::clone(&failures);
    let scheduler = Scheduler::builder()
        .refresh(Arc::clone(&executor), plan())
        .on_job_failed(move |job, error| {
            f.lock().unwrap().push((job.to_string(), error.to_string()));
        })
        .build();

    scheduler.start().unwrap();
    sleep(Duration::from_millis(1)).await;
    let warm = executor.cache().get(PRODUCTS).await.unwrap().payload;

    upstream.go_down();
    sleep(Duration::from_secs(60)).await;

    assert_eq!(scheduler.status()[REFRESH_PRODUCTS].failures, 1);
    assert_eq!(executor.cache().get(PRODUCTS).await.unwrap().payload, warm);
    assert_eq!(
        *failures.lock().unwrap(),
        vec![(
            REFRESH_PRODUCTS.to_string(),
            "upstream unavailable, kept cached data".to_string()
        )]
    );
}

#[tokio::test(start_paused = true)]
async fn health_probe_closes_the_circuit_after_an_outage() {
    let upstream = Upstream::new();
    let executor = executor(&upstream);
    let plan = RefreshPlan {
        health_interval: Duration::from_secs(60),
        ..RefreshPlan::default()
    };
    let scheduler = Scheduler::builder()
        .refresh(Arc::clone(&executor), plan)
        .build();

    scheduler.start().unwrap();
    sleep(Duration::from_millis(1)).await;

    upstream.go_down();
    for _ in 0..3 {
        let _ = executor
            .execute(&RequestSpec::get("orders"), None, false)
            .await;
    }
    assert_eq!(executor.breaker().state(), CircuitState::Open);

    upstream.recover();
    sleep(Duration::from_secs(60)).await;

    assert_eq!(executor.breaker().state(), CircuitState::Closed);
    let health = &scheduler.status()[POLL_HEALTH];
    assert_eq!(health.runs, 2);
    assert_eq!(health.failures, 0);
}

#[tokio::test(start_paused = true)]
async fn health_probe_fails_fast_while_open() {
    let upstream = Upstream::new();
    let executor = executor(&upstream);
    executor.breaker().force_open();
    let scheduler = Scheduler::builder()
        .refresh(Arc::clone(&executor), plan())
        .build();

    scheduler.start().unwrap();
    sleep(Duration::from_millis(1)).await;

    assert_eq!(scheduler.status()[POLL_HEALTH].failures, 1);
    assert!(!upstream.seen().contains(&PROBE.to_string()));
}

#[tokio::test(start_paused = true)]
async fn custom_plan_requests_are_used() {
    let upstream = Upstream::new();
    let executor = executor(&upstream);
    let plan = RefreshPlan {
        products: RequestSpec::get("products/high_price")
            .query("page", 0)
            .query("size", 4),
        ..plan()
    };
    let scheduler = Scheduler::builder().refresh(Arc::clone(&executor), plan).build();

    scheduler.start().unwrap();
    sleep(Duration::from_millis(1)).await;

    let entry = executor
        .cache()
        .get("GET products/high_price?page=0&size=4")
        .await
        .unwrap();
    assert_eq!(
        entry.payload["request"],
        json!("GET products/high_price?page=0&size=4")
    );
}
