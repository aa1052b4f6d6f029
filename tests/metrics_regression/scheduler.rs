//! Scheduler metrics regression tests

use super::helpers::*;
use resilient_api_scheduler::{OverlapPolicy, Scheduler};
use serial_test::serial;
use std::time::Duration;

#[tokio::test(start_paused = true)]
#[serial]
async fn scheduler_metrics_exist() {
    init_recorder();

    let scheduler = Scheduler::builder()
        .name("metrics_scheduler")
        .job("ok", Duration::from_secs(60), || async { Ok::<_, String>(()) })
        .job("broken", Duration::from_secs(60), || async {
            Err::<(), _>("upstream down".to_string())
        })
        .build();

    scheduler.start().unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    scheduler.stop();

    assert_counter_exists("scheduler_job_runs_total");
    assert_metric_has_label("scheduler_job_runs_total", "scheduler", "metrics_scheduler");
    assert_metric_has_label("scheduler_job_runs_total", "job", "ok");
    assert_metric_has_label("scheduler_job_runs_total", "job", "broken");
    assert_metric_has_label("scheduler_job_runs_total", "outcome", "success");
    assert_metric_has_label("scheduler_job_runs_total", "outcome", "failure");
}

#[tokio::test(start_paused = true)]
#[serial]
async fn scheduler_skipped_ticks_recorded() {
    init_recorder();

    let scheduler = Scheduler::builder()
        .name("skipping_scheduler")
        .overlap_policy(OverlapPolicy::Skip)
        .job("slow", Duration::from_secs(1), || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, String>(())
        })
        .build();

    scheduler.start().unwrap();
    tokio::time::sleep(Duration::from_millis(2500)).await;
    scheduler.stop();

    assert_metric_has_label("scheduler_job_runs_total", "scheduler", "skipping_scheduler");
    assert_metric_has_label("scheduler_job_runs_total", "outcome", "skipped");
}
