use futures::future::BoxFuture;
use resilient_api_scheduler::{OverlapPolicy, Scheduler};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

#[tokio::test(start_paused = true)]
async fn failing_handler_keeps_ticking() {
    let errors = Arc::new(Mutex::new(Vec::new()));
    let e = Arc::clone(&errors);
    let attempts = Arc::new(AtomicUsize::new(0));
    let a = Arc::clone(&attempts);

    let scheduler = Scheduler::builder()
        .on_job_failed(move |job, error| {
            e.lock().unwrap().push(format!("{}: {}", job, error));
        })
        .job("flaky", Duration::from_secs(1), move || {
            let n = a.fetch_add(1, Ordering::SeqCst);
            async move { Err::<(), _>(format!("attempt {} failed", n)) }
        })
        .build();

    scheduler.start().unwrap();
    sleep(Duration::from_millis(3_500)).await;

    assert_eq!(attempts.load(Ordering::SeqCst), 4);
    let status = &scheduler.status()["flaky"];
    assert_eq!(status.runs, 4);
    assert_eq!(status.failures, 4);
    assert_eq!(errors.lock().unwrap()[0], "flaky: attempt 0 failed");
}

#[tokio::test(start_paused = true)]
async fn panicking_handler_keeps_ticking() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let a = Arc::clone(&attempts);
    let errors = Arc::new(Mutex::new(Vec::new()));
    let e = Arc::clone(&errors);

    let scheduler = Scheduler::builder()
        .on_job_failed(move |_, error| e.lock().unwrap().push(error.to_string()))
        .job("explosive", Duration::from_secs(1), move || {
            a.fetch_add(1, Ordering::SeqCst);
            async move {
                if true {
                    panic!("handler blew up");
                }
                Ok::<(), String>(())
            }
        })
        .build();

    scheduler.start().unwrap();
    sleep(Duration::from_millis(2_500)).await;

    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(scheduler.status()["explosive"].failures, 3);
    assert_eq!(errors.lock().unwrap()[0], "panicked: handler blew up");
}

#[tokio::test(start_paused = true)]
async fn one_failing_job_does_not_affect_another() {
    let healthy = Arc::new(AtomicUsize::new(0));
    let h = Arc::clone(&healthy);

    let scheduler = Scheduler::builder()
        .job("broken", Duration::from_secs(1), || async {
            Err::<(), _>("always")
        })
        .job("healthy", Duration::from_secs(1), move || {
            let h = Arc::clone(&h);
            async move {
                h.fetch_add(1, Ordering::SeqCst);
                Ok::<(), &str>(())
            }
        })
        .build();

    scheduler.start().unwrap();
    sleep(Duration::from_millis(2_500)).await;

    assert_eq!(healthy.load(Ordering::SeqCst), 3);
    assert_eq!(scheduler.status()["healthy"].failures, 0);
}

fn slow_job(
    started: &Arc<AtomicUsize>,
) -> impl Fn() -> BoxFuture<'static, Result<(), String>> + Send + Sync + 'static {
    let started = Arc::clone(started);
    move || {
        let started = Arc::clone(&started);
        Box::pin(async move {
            started.fetch_add(1, Ordering::SeqCst);
            sleep(Duration::from_secs(25)).await;
            Ok(())
        })
    }
}

#[tokio::test(start_paused = true)]
async fn overlapping_runs_are_allowed_by_default() {
    let started = Arc::new(AtomicUsize::new(0));
    let scheduler = Scheduler::builder()
        .job("slow", Duration::from_secs(10), slow_job(&started))
        .build();

    scheduler.start().unwrap();
    sleep(Duration::from_millis(30_500)).await;

    assert_eq!(started.load(Ordering::SeqCst), 4);
    assert!(scheduler.status()["slow"].running);
}

#[tokio::test(start_paused = true)]
async fn skip_policy_skips_ticks_while_running() {
    let started = Arc::new(AtomicUsize::new(0));
    let skipped = Arc::new(AtomicUsize::new(0));
    let s = Arc::clone(&skipped);

    let scheduler = Scheduler::builder()
        .overlap_policy(OverlapPolicy::Skip)
        .on_job_skipped(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        })
        .job("slow", Duration::from_secs(10), slow_job(&started))
        .build();

    scheduler.start().unwrap();
    sleep(Duration::from_millis(30_500)).await;

    // runs at 0s and 30s; ticks at 10s and 20s are skipped
    assert_eq!(started.load(Ordering::SeqCst), 2);
    assert_eq!(skipped.load(Ordering::SeqCst), 2);
    assert_eq!(scheduler.status()["slow"].runs, 1);
}
