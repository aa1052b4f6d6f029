use crate::endpoints::Endpoint;
use crate::status::SystemStatus;
use crate::storage::ClientStorage;
use crate::{ClientConfig, ClientError};
use resilient_api_cache::{CacheConfig, CacheSnapshot, FileStorage, MemoryStorage};
use resilient_api_circuitbreaker::{BreakerSnapshot, CircuitBreaker};
use resilient_api_executor::{
    ApiError, ApiResponse, ExecutorConfig, HttpTransport, RequestSpec, ResilientExecutor,
};
use resilient_api_scheduler::{JobStatus, RefreshPlan, Scheduler};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tower::Service;

/// Storefront API client: every call goes through the circuit breaker and the
/// durable cache, and a scheduler keeps popular listings warm.
///
/// Background jobs run only between [`start_scheduler`](Self::start_scheduler)
/// and [`stop_scheduler`](Self::stop_scheduler), or until the client is
/// dropped.
///
/// # Examples
///
/// ```rust,no_run
/// use resilient_api::{endpoints, ApiClient, ClientConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ApiClient::connect(ClientConfig::new("https://api.example.com/api/v1")).await?;
/// client.start_scheduler()?;
///
/// let page = client.call(&endpoints::products(0, 8)).await?;
/// if page.is_degraded() {
///     println!("showing cached products");
/// }
/// # Ok(())
/// # }
/// ```
pub struct ApiClient<T = HttpTransport> {
    config: ClientConfig,
    executor: Arc<ResilientExecutor<T, ClientStorage>>,
    scheduler: Scheduler,
}

impl ApiClient {
    /// Builds a client that talks HTTP to `config.base_url`.
    pub async fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let mut transport = HttpTransport::builder(config.base_url.clone()).timeout(config.timeout);
        if let Some(token) = &config.bearer_token {
            transport = transport.bearer_token(token.clone());
        }
        let transport = transport.build().map_err(ClientError::Transport)?;
        Self::with_transport(config, transport).await
    }
}

impl<T> ApiClient<T>
where
    T: Service<RequestSpec, Response = Value, Error = ApiError> + Clone + Send + Sync + 'static,
    T::Future: Send,
{
    /// Builds a client over any transport service.
    pub async fn with_transport(config: ClientConfig, transport: T) -> Result<Self, ClientError> {
        config.validate()?;

        let storage = match &config.cache_dir {
            Some(dir) => ClientStorage::File(FileStorage::open(dir.clone()).await?),
            None => ClientStorage::Memory(MemoryStorage::new()),
        };
        let cache = CacheConfig::builder()
            .name(config.name.clone())
            .ttl(config.cache_ttl)
            .namespace(config.cache_namespace.clone())
            .build(storage);
        let breaker = CircuitBreaker::builder()
            .name(config.name.clone())
            .failure_threshold(config.failure_threshold)
            .reset_timeout(config.reset_timeout)
            .build();
        let executor = Arc::new(
            ExecutorConfig::builder()
                .name(config.name.clone())
                .breaker(breaker)
                .build(transport, cache),
        );

        let plan = RefreshPlan {
            products_interval: config.products_interval,
            categories_interval: config.categories_interval,
            health_interval: config.health_interval,
            ..RefreshPlan::default()
        };
        let scheduler = Scheduler::builder()
            .name(config.name.clone())
            .overlap_policy(config.overlap)
            .refresh(Arc::clone(&executor), plan)
            .build();

        #[cfg(feature = "tracing")]
        tracing::info!(
            client = %config.name,
            base_url = %config.base_url,
            persistent_cache = config.cache_dir.is_some(),
            "api client ready"
        );

        Ok(Self {
            config,
            executor,
            scheduler,
        })
    }

    /// Calls a storefront endpoint, caching reads.
    pub async fn call(&self, endpoint: &Endpoint) -> Result<ApiResponse, ApiError> {
        let key = endpoint.cache_key();
        self.executor
            .execute(endpoint.request(), key.as_deref(), false)
            .await
    }

    /// Like [`call`](Self::call), but always asks the upstream and rewrites
    /// the cached entry.
    pub async fn refresh(&self, endpoint: &Endpoint) -> Result<ApiResponse, ApiError> {
        let key = endpoint.cache_key();
        self.executor
            .execute(endpoint.request(), key.as_deref(), true)
            .await
    }

    /// Runs an arbitrary request through the executor.
    pub async fn execute(
        &self,
        spec: &RequestSpec,
        cache_key: Option<&str>,
        force_refresh: bool,
    ) -> Result<ApiResponse, ApiError> {
        self.executor.execute(spec, cache_key, force_refresh).await
    }

    /// Read-only view of the breaker.
    pub fn breaker_snapshot(&self) -> BreakerSnapshot {
        self.executor.breaker_snapshot()
    }

    /// Read-only view of the cache.
    pub async fn cache_snapshot(&self) -> CacheSnapshot {
        self.executor.cache_snapshot().await
    }

    /// Status of every background job.
    pub fn scheduler_status(&self) -> HashMap<String, JobStatus> {
        self.scheduler.status()
    }

    /// Breaker, cache and jobs in one timestamped report.
    pub async fn system_status(&self) -> SystemStatus {
        let breaker = self.executor.breaker_snapshot();
        let cache = self.executor.cache_snapshot().await;
        SystemStatus::collect(
            &breaker,
            cache,
            self.scheduler.is_running(),
            self.scheduler.status(),
        )
    }

    /// Starts the background jobs. Each fires once right away.
    pub fn start_scheduler(&self) -> Result<(), ClientError> {
        self.scheduler.start()?;
        Ok(())
    }

    /// Stops the background jobs.
    pub fn stop_scheduler(&self) {
        self.scheduler.stop();
    }

    /// Removes every cached response and returns how many were removed.
    pub async fn clear_cache(&self) -> usize {
        let removed = self.executor.clear_cache().await;

        #[cfg(feature = "tracing")]
        tracing::info!(client = %self.config.name, removed, "cache cleared");

        removed
    }

    /// The executor behind this client.
    pub fn executor(&self) -> &Arc<ResilientExecutor<T, ClientStorage>> {
        &self.executor
    }

    /// The scheduler behind this client.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl<T> std::fmt::Debug for ApiClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("name", &self.config.name)
            .field("base_url", &self.config.base_url)
            .field("scheduler", &self.scheduler)
            .finish()
    }
}
