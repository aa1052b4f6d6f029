use crate::config::{ExecutorConfig, ExecutorConfigBuilder};
use crate::events::ExecutorEvent;
use crate::{ApiError, RequestSpec};
use resilient_api_cache::{CacheEntry, CacheSnapshot, CacheStorage, DurableCache, MemoryStorage};
use resilient_api_circuitbreaker::{BreakerSnapshot, CircuitBreaker};
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tower::{Service, ServiceExt};

#[cfg(feature = "metrics")]
use metrics::{counter, histogram};

/// Where the payload of an [`ApiResponse`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseOrigin {
    /// A remote call that just succeeded.
    Network,
    /// A fresh cache entry; no remote call was made.
    Cache,
    /// A cached entry served in place of a failed or rejected remote call.
    /// It may be older than the cache TTL.
    Fallback,
}

impl ResponseOrigin {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseOrigin::Network => "network",
            ResponseOrigin::Cache => "cache",
            ResponseOrigin::Fallback => "fallback",
        }
    }
}

/// Payload returned by [`ResilientExecutor::execute`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    /// Decoded response body.
    pub payload: Value,
    /// Where the payload came from.
    pub origin: ResponseOrigin,
    /// Write time of the cache entry, in epoch milliseconds, when the payload
    /// was served from cache.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stored_at: Option<u64>,
}

impl ApiResponse {
    fn network(payload: Value) -> Self {
        Self {
            payload,
            origin: ResponseOrigin::Network,
            stored_at: None,
        }
    }

    fn cached(entry: CacheEntry, origin: ResponseOrigin) -> Self {
        Self {
            payload: entry.payload,
            origin,
            stored_at: Some(entry.stored_at),
        }
    }

    /// Whether a failed or rejected remote call was papered over with
    /// cached data.
    pub fn is_degraded(&self) -> bool {
        self.origin == ResponseOrigin::Fallback
    }

    /// Consumes the response and returns the payload.
    pub fn into_payload(self) -> Value {
        self.payload
    }
}

/// Executes remote calls behind a circuit breaker and a durable cache.
///
/// For each call, in order:
///
/// 1. The breaker is asked for a permit. Without one, a cached entry of any
///    age is served as a fallback, or the call fails with
///    [`ApiError::ServiceUnavailable`]. The transport is not touched.
/// 2. Unless `force_refresh` is set, a fresh cache entry is served without a
///    remote call. The breaker sees no outcome.
/// 3. The remote call runs. Success closes the breaker and refreshes the
///    cache; failure is recorded with the breaker and answered with a cached
///    entry of any age when there is one.
///
/// Without a cache key the cache is never read or written.
pub struct ResilientExecutor<T, S = MemoryStorage> {
    transport: T,
    breaker: CircuitBreaker,
    cache: DurableCache<S>,
    config: ExecutorConfig,
}

impl<T, S> ResilientExecutor<T, S>
where
    T: Service<RequestSpec, Response = Value, Error = ApiError> + Clone + Send + Sync + 'static,
    T::Future: Send,
    S: CacheStorage,
{
    /// Creates an executor from its parts.
    pub fn new(
        transport: T,
        breaker: CircuitBreaker,
        cache: DurableCache<S>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            transport,
            breaker,
            cache,
            config,
        }
    }

    /// Returns a new configuration builder.
    pub fn builder() -> ExecutorConfigBuilder {
        ExecutorConfigBuilder::new()
    }

    /// Runs one request.
    ///
    /// `cache_key` enables caching and stale fallback for this call;
    /// `force_refresh` skips the fresh-cache shortcut but still writes the
    /// result back.
    pub async fn execute(
        &self,
        spec: &RequestSpec,
        cache_key: Option<&str>,
        force_refresh: bool,
    ) -> Result<ApiResponse, ApiError> {
        let started = Instant::now();

        #[cfg(feature = "tracing")]
        let result = {
            use tracing::Instrument;

            let span = tracing::debug_span!(
                "execute",
                executor = %self.config.name,
                request = %spec,
                cache_key = cache_key.unwrap_or(""),
                force_refresh,
                duration_ms = tracing::field::Empty,
            );
            let result = self
                .run(spec, cache_key, force_refresh)
                .instrument(span.clone())
                .await;
            span.record("duration_ms", started.elapsed().as_millis() as u64);
            result
        };

        #[cfg(not(feature = "tracing"))]
        let result = self.run(spec, cache_key, force_refresh).await;

        self.report(spec, &result, started.elapsed());
        result
    }

    async fn run(
        &self,
        spec: &RequestSpec,
        cache_key: Option<&str>,
        force_refresh: bool,
    ) -> Result<ApiResponse, ApiError> {
        let Some(permit) = self.breaker.try_acquire() else {
            #[cfg(feature = "tracing")]
            tracing::info!(executor = %self.config.name, "circuit open, using cached data if any");

            return match self.fallback(cache_key).await {
                Some(response) => Ok(response),
                None => Err(ApiError::ServiceUnavailable),
            };
        };

        if let (Some(key), false) = (cache_key, force_refresh) {
            if let Some(entry) = self.cache.get(key).await {
                drop(permit);
                return Ok(ApiResponse::cached(entry, ResponseOrigin::Cache));
            }
        }

        match self.transport.clone().oneshot(spec.clone()).await {
            Ok(payload) => {
                permit.record_success();
                if let Some(key) = cache_key {
                    self.cache.set(key, &payload).await;
                }
                Ok(ApiResponse::network(payload))
            }
            Err(error) => {
                permit.record_failure();

                #[cfg(feature = "tracing")]
                tracing::warn!(
                    executor = %self.config.name,
                    request = %spec,
                    error = %error,
                    breaker_state = self.breaker.state().as_str(),
                    consecutive_failures = self.breaker.snapshot().consecutive_failures,
                    "remote call failed"
                );

                match self.fallback(cache_key).await {
                    Some(response) => Ok(response),
                    None => Err(error),
                }
            }
        }
    }

    async fn fallback(&self, cache_key: Option<&str>) -> Option<ApiResponse> {
        let entry = self.cache.get_stale(cache_key?).await?;

        #[cfg(feature = "tracing")]
        tracing::info!(
            executor = %self.config.name,
            key = %entry.key,
            stored_at = entry.stored_at,
            "serving cached data in place of remote call"
        );

        Some(ApiResponse::cached(entry, ResponseOrigin::Fallback))
    }

    fn report(&self, spec: &RequestSpec, result: &Result<ApiResponse, ApiError>, duration: Duration) {
        #[cfg(feature = "metrics")]
        {
            let outcome = match result {
                Ok(response) => response.origin.as_str(),
                Err(error) => error.kind(),
            };
            counter!(
                "executor_calls_total",
                "executor" => self.config.name.clone(),
                "outcome" => outcome
            )
            .increment(1);
            histogram!(
                "executor_call_duration_seconds",
                "executor" => self.config.name.clone()
            )
            .record(duration.as_secs_f64());
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            executor = %self.config.name,
            request = %spec,
            duration_ms = duration.as_millis() as u64,
            ok = result.is_ok(),
            "call finished"
        );

        if self.config.event_listeners.is_empty() {
            return;
        }
        let event = match result {
            Ok(response) => ExecutorEvent::CallSucceeded {
                name: self.config.name.clone(),
                timestamp: Instant::now(),
                request: spec.to_string(),
                origin: response.origin,
                duration,
            },
            Err(error) => ExecutorEvent::CallFailed {
                name: self.config.name.clone(),
                timestamp: Instant::now(),
                request: spec.to_string(),
                error: error.clone(),
                duration,
            },
        };
        self.config.event_listeners.emit(&event);
    }

    /// Read-only view of the breaker.
    pub fn breaker_snapshot(&self) -> BreakerSnapshot {
        self.breaker.snapshot()
    }

    /// Read-only view of the cache.
    pub async fn cache_snapshot(&self) -> CacheSnapshot {
        self.cache.snapshot().await
    }

    /// Removes every cached entry and returns how many were removed.
    pub async fn clear_cache(&self) -> usize {
        self.cache.clear().await
    }

    /// The breaker guarding the upstream.
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// The response cache.
    pub fn cache(&self) -> &DurableCache<S> {
        &self.cache
    }

    /// The configuration this executor was built with.
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Name of this executor.
    pub fn name(&self) -> &str {
        &self.config.name
    }
}

impl<T, S> std::fmt::Debug for ResilientExecutor<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientExecutor")
            .field("name", &self.config.name)
            .field("breaker", &self.breaker)
            .field("cache", &self.cache)
            .finish()
    }
}
