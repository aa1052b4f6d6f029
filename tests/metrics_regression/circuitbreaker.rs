//! Circuit breaker metrics regression tests

use super::helpers::*;
use resilient_api_circuitbreaker::CircuitBreaker;
use serial_test::serial;
use std::time::Duration;

#[tokio::test]
#[serial]
async fn circuitbreaker_metrics_exist() {
    init_recorder();

    let breaker = CircuitBreaker::builder()
        .name("metrics_cb")
        .failure_threshold(2)
        .reset_timeout(Duration::from_secs(60))
        .build();

    breaker.on_success();
    breaker.on_failure();
    breaker.on_failure();
    assert!(breaker.try_acquire().is_none());

    assert_counter_exists("circuitbreaker_calls_total");
    assert_metric_has_label("circuitbreaker_calls_total", "circuitbreaker", "metrics_cb");
    assert_metric_has_label("circuitbreaker_calls_total", "outcome", "success");
    assert_metric_has_label("circuitbreaker_calls_total", "outcome", "failure");
    assert_metric_has_label("circuitbreaker_calls_total", "outcome", "rejected");

    assert_counter_exists("circuitbreaker_transitions_total");
    assert_metric_has_label("circuitbreaker_transitions_total", "from", "Closed");
    assert_metric_has_label("circuitbreaker_transitions_total", "to", "Open");

    assert_gauge_exists("circuitbreaker_state");
    assert_metric_has_label("circuitbreaker_state", "circuitbreaker", "metrics_cb");
}

#[tokio::test(start_paused = true)]
#[serial]
async fn circuitbreaker_recovery_transitions_recorded() {
    init_recorder();

    let breaker = CircuitBreaker::builder()
        .name("recovery_cb")
        .failure_threshold(1)
        .reset_timeout(Duration::from_secs(5))
        .build();

    breaker.on_failure();
    tokio::time::advance(Duration::from_secs(5)).await;

    let permit = breaker.try_acquire().expect("probe admitted");
    permit.record_success();

    assert_metric_has_label("circuitbreaker_transitions_total", "to", "HalfOpen");
    assert_metric_has_label("circuitbreaker_transitions_total", "from", "HalfOpen");
    assert_metric_has_label("circuitbreaker_transitions_total", "to", "Closed");
}
