//! Test doubles shared by the integration suites.

#![allow(dead_code)]

use futures::future::BoxFuture;
use resilient_api_executor::{ApiError, RequestSpec};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tower::Service;

/// Fake upstream whose behaviour can be switched while a test runs.
///
/// Healthy responses echo the request's cache key and a per-upstream call
/// number, so tests can tell a fresh response from a cached one.
#[derive(Clone, Default)]
pub struct Upstream {
    failure: Arc<Mutex<Option<ApiError>>>,
    delay: Arc<Mutex<Option<Duration>>>,
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl Upstream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following call fail with `error`.
    pub fn fail_with(&self, error: ApiError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    /// Makes every following call fail with a transport error.
    pub fn go_down(&self) {
        self.fail_with(ApiError::Transport("connection refused".into()));
    }

    /// Makes every following call succeed.
    pub fn recover(&self) {
        *self.failure.lock().unwrap() = None;
    }

    /// Delays every following response.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Number of calls that reached the upstream.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Cache keys of every request that reached the upstream, in order.
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

impl Service<RequestSpec> for Upstream {
    type Response = Value;
    type Error = ApiError;
    type Future = BoxFuture<'static, Result<Value, ApiError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: RequestSpec) -> Self::Future {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let key = req.cache_key();
        self.seen.lock().unwrap().push(key.clone());
        let failure = self.failure.lock().unwrap().clone();
        let delay = *self.delay.lock().unwrap();

        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            match failure {
                Some(error) => Err(error),
                None => Ok(json!({ "request": key, "call": n })),
            }
        })
    }
}
