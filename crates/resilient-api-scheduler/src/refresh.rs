//! Standard cache-warming and health-probing jobs.

use crate::scheduler::{erase, JobDefinition, SchedulerBuilder};
use resilient_api_cache::CacheStorage;
use resilient_api_executor::{ApiError, RequestSpec, ResilientExecutor};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tower::Service;

/// Default interval of the product listing refresh: 1 hour.
pub const DEFAULT_PRODUCTS_INTERVAL: Duration = Duration::from_millis(3_600_000);

/// Default interval of the category refresh: 6 hours.
pub const DEFAULT_CATEGORIES_INTERVAL: Duration = Duration::from_millis(21_600_000);

/// Default interval of the health probe: 5 minutes.
pub const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_millis(300_000);

/// Job name of the product listing refresh.
pub const REFRESH_PRODUCTS: &str = "refresh-products";

/// Job name of the category refresh.
pub const REFRESH_CATEGORIES: &str = "refresh-categories";

/// Job name of the health probe.
pub const POLL_HEALTH: &str = "poll-health";

/// Requests and intervals of the standard background jobs.
///
/// The two refresh jobs re-fetch their request with `force_refresh` so the
/// cached entry is rewritten even while it is still fresh. The health probe
/// runs without a cache key: it never touches the cache, so while the circuit
/// is open it is what gives the breaker its probe.
#[derive(Debug, Clone)]
pub struct RefreshPlan {
    /// Product listing to keep warm.
    pub products: RequestSpec,
    /// Interval of the product listing refresh.
    pub products_interval: Duration,
    /// Category list to keep warm.
    pub categories: RequestSpec,
    /// Interval of the category refresh.
    pub categories_interval: Duration,
    /// Cheap request used to probe the upstream.
    pub health_probe: RequestSpec,
    /// Interval of the health probe.
    pub health_interval: Duration,
}

impl Default for RefreshPlan {
    fn default() -> Self {
        Self {
            products: RequestSpec::get("products").query("page", 0).query("size", 8),
            products_interval: DEFAULT_PRODUCTS_INTERVAL,
            categories: RequestSpec::get("categories"),
            categories_interval: DEFAULT_CATEGORIES_INTERVAL,
            health_probe: RequestSpec::get("products").query("page", 0).query("size", 1),
            health_interval: DEFAULT_HEALTH_INTERVAL,
        }
    }
}

/// Why a background job counted as failed.
#[derive(Debug, Error)]
pub enum RefreshError {
    /// The remote call failed and nothing was cached.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The remote call failed; the cached entry was kept as is.
    #[error("upstream unavailable, kept cached data")]
    Degraded,
}

async fn refresh<T, S>(executor: &ResilientExecutor<T, S>, spec: &RequestSpec) -> Result<(), RefreshError>
where
    T: Service<RequestSpec, Response = Value, Error = ApiError> + Clone + Send + Sync + 'static,
    T::Future: Send,
    S: CacheStorage,
{
    let key = spec.cache_key();
    let response = executor.execute(spec, Some(&key), true).await?;
    if response.is_degraded() {
        return Err(RefreshError::Degraded);
    }
    Ok(())
}

async fn poll_health<T, S>(executor: &ResilientExecutor<T, S>, probe: &RequestSpec) -> Result<(), RefreshError>
where
    T: Service<RequestSpec, Response = Value, Error = ApiError> + Clone + Send + Sync + 'static,
    T::Future: Send,
    S: CacheStorage,
{
    let outcome = executor.execute(probe, None, false).await;

    #[cfg(feature = "tracing")]
    {
        let breaker = executor.breaker_snapshot();
        let cache = executor.cache_snapshot().await;
        tracing::info!(
            executor = %executor.name(),
            breaker_state = breaker.state.as_str(),
            consecutive_failures = breaker.consecutive_failures,
            cache_items = cache.item_count,
            cache_bytes = cache.total_size,
            stale_items = cache.stale_items().count(),
            "system status"
        );
    }

    outcome.map(|_| ()).map_err(Into::into)
}

impl SchedulerBuilder {
    /// Adds the standard jobs of `plan`, all calling through `executor`:
    /// `refresh-products`, `refresh-categories` and `poll-health`.
    ///
    /// # Panics
    ///
    /// Panics if an interval of the plan is zero.
    pub fn refresh<T, S>(mut self, executor: Arc<ResilientExecutor<T, S>>, plan: RefreshPlan) -> Self
    where
        T: Service<RequestSpec, Response = Value, Error = ApiError> + Clone + Send + Sync + 'static,
        T::Future: Send,
        S: CacheStorage,
    {
        let jobs = [
            (REFRESH_PRODUCTS, plan.products_interval, plan.products, false),
            (REFRESH_CATEGORIES, plan.categories_interval, plan.categories, false),
            (POLL_HEALTH, plan.health_interval, plan.health_probe, true),
        ];

        for (name, interval, spec, probe) in jobs {
            if interval.is_zero() {
                panic!("job interval must be greater than zero");
            }
            let executor = Arc::clone(&executor);
            let spec = Arc::new(spec);
            let handler = erase(move || {
                let executor = Arc::clone(&executor);
                let spec = Arc::clone(&spec);
                async move {
                    if probe {
                        poll_health(&executor, &spec).await
                    } else {
                        refresh(&executor, &spec).await
                    }
                }
            });
            self.push(JobDefinition {
                name: name.to_string(),
                interval,
                handler,
            });
        }
        self
    }
}
