use crate::events::ExecutorEvent;
use crate::{ApiError, RequestSpec, ResilientExecutor, ResponseOrigin};
use resilient_api_cache::{CacheStorage, DurableCache};
use resilient_api_circuitbreaker::CircuitBreaker;
use resilient_api_core::EventListeners;
use serde_json::Value;
use std::time::Duration;
use tower::Service;

/// Configuration for a resilient executor.
pub struct ExecutorConfig {
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<ExecutorEvent>,
}

impl ExecutorConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ExecutorConfigBuilder {
        ExecutorConfigBuilder::new()
    }

    /// Name of the executor instance.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builder for configuring and constructing a [`ResilientExecutor`].
pub struct ExecutorConfigBuilder {
    name: String,
    breaker: Option<CircuitBreaker>,
    event_listeners: EventListeners<ExecutorEvent>,
}

impl ExecutorConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            name: String::from("<unnamed>"),
            breaker: None,
            event_listeners: EventListeners::new(),
        }
    }

    /// Give this executor a human-readable name for observability.
    ///
    /// Default: `<unnamed>`
    pub fn name<N: Into<String>>(mut self, n: N) -> Self {
        self.name = n.into();
        self
    }

    /// Uses the given breaker to guard the upstream.
    ///
    /// Default: a breaker with default settings, named after the executor
    pub fn breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.breaker = Some(breaker);
        self
    }

    /// Registers a callback for calls that produced a payload, called with
    /// where the payload came from and how long the call took.
    pub fn on_call_succeeded<F>(mut self, f: F) -> Self
    where
        F: Fn(ResponseOrigin, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.on(move |event: &ExecutorEvent| {
            if let ExecutorEvent::CallSucceeded {
                origin, duration, ..
            } = event
            {
                f(*origin, *duration);
            }
        });
        self
    }

    /// Registers a callback for failed calls.
    pub fn on_call_failed<F>(mut self, f: F) -> Self
    where
        F: Fn(&ApiError, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.on(move |event: &ExecutorEvent| {
            if let ExecutorEvent::CallFailed {
                error, duration, ..
            } = event
            {
                f(error, *duration);
            }
        });
        self
    }

    /// Builds the executor over a transport and a cache.
    pub fn build<T, S>(self, transport: T, cache: DurableCache<S>) -> ResilientExecutor<T, S>
    where
        T: Service<RequestSpec, Response = Value, Error = ApiError> + Clone + Send + Sync + 'static,
        T::Future: Send,
        S: CacheStorage,
    {
        let breaker = match self.breaker {
            Some(breaker) => breaker,
            None => CircuitBreaker::builder().name(self.name.clone()).build(),
        };
        let config = ExecutorConfig {
            name: self.name,
            event_listeners: self.event_listeners,
        };
        ResilientExecutor::new(transport, breaker, cache, config)
    }
}

impl Default for ExecutorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
