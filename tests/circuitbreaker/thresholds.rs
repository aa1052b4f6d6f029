use resilient_api_circuitbreaker::{CircuitBreaker, CircuitState};
use std::time::Duration;

fn breaker(threshold: u32) -> CircuitBreaker {
    CircuitBreaker::builder()
        .name("thresholds")
        .failure_threshold(threshold)
        .reset_timeout(Duration::from_secs(30))
        .build()
}

#[tokio::test(start_paused = true)]
async fn opens_after_exactly_threshold_failures() {
    let cb = breaker(3);

    cb.on_failure();
    cb.on_failure();
    assert_eq!(cb.state(), CircuitState::Closed);
    assert!(!cb.is_open());

    cb.on_failure();
    assert_eq!(cb.state(), CircuitState::Open);
    assert!(cb.is_open());

    let snap = cb.snapshot();
    assert_eq!(snap.consecutive_failures, 3);
    let last = snap.last_failure_at.unwrap();
    assert_eq!(snap.next_probe_at, Some(last + Duration::from_secs(30)));
    assert_eq!(snap.time_until_probe, Some(Duration::from_secs(30)));
}

#[tokio::test]
async fn success_clears_the_count() {
    let cb = breaker(3);

    cb.on_failure();
    cb.on_failure();
    cb.on_success();
    cb.on_failure();
    cb.on_failure();

    assert_eq!(cb.state(), CircuitState::Closed);
    assert_eq!(cb.snapshot().consecutive_failures, 2);
}

#[tokio::test]
async fn success_clears_failure_times() {
    let cb = breaker(3);
    cb.on_failure();
    assert!(cb.snapshot().last_failure_at.is_some());

    cb.on_success();
    let snap = cb.snapshot();
    assert_eq!(snap.consecutive_failures, 0);
    assert_eq!(snap.last_failure_at, None);
    assert_eq!(snap.next_probe_at, None);
}

#[tokio::test]
async fn threshold_of_one_opens_on_first_failure() {
    let cb = breaker(1);
    cb.on_failure();
    assert_eq!(cb.state(), CircuitState::Open);
}

#[tokio::test]
async fn failures_while_open_keep_counting() {
    let cb = breaker(2);
    cb.on_failure();
    cb.on_failure();
    cb.on_failure();

    assert_eq!(cb.state(), CircuitState::Open);
    assert_eq!(cb.snapshot().consecutive_failures, 3);
}

#[tokio::test]
async fn call_counts_inner_errors_only() {
    let cb = breaker(2);

    let err = cb.call(async { Err::<(), _>("boom") }).await.unwrap_err();
    assert_eq!(err.into_inner(), Some("boom"));
    let ok = cb.call(async { Ok::<_, &str>(7) }).await.unwrap();
    assert_eq!(ok, 7);
    assert_eq!(cb.snapshot().consecutive_failures, 0);

    let _ = cb.call(async { Err::<(), _>("boom") }).await;
    let _ = cb.call(async { Err::<(), _>("boom") }).await;
    let rejected = cb.call(async { Ok::<_, &str>(1) }).await.unwrap_err();
    assert!(rejected.is_circuit_open());
}

#[test]
#[should_panic(expected = "failure_threshold must be at least 1")]
fn zero_threshold_is_rejected() {
    let _ = CircuitBreaker::builder().failure_threshold(0).build();
}
