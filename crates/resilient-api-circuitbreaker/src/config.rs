use crate::events::CircuitBreakerEvent;
use crate::CircuitState;
use resilient_api_core::EventListeners;
use std::time::Duration;

/// Consecutive failures that open the circuit by default.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

/// How long an open circuit waits before allowing a probe, by default.
pub const DEFAULT_RESET_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Configuration for a circuit breaker.
pub struct CircuitBreakerConfig {
    pub(crate) failure_threshold: u32,
    pub(crate) reset_timeout: Duration,
    pub(crate) event_listeners: EventListeners<CircuitBreakerEvent>,
    pub(crate) name: String,
}

impl CircuitBreakerConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Consecutive failures needed to open the circuit.
    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    /// Wait between opening and the first probe.
    pub fn reset_timeout(&self) -> Duration {
        self.reset_timeout
    }

    /// Name of the breaker instance.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builder for configuring and constructing a circuit breaker.
pub struct CircuitBreakerConfigBuilder {
    failure_threshold: u32,
    reset_timeout: Duration,
    event_listeners: EventListeners<CircuitBreakerEvent>,
    name: String,
}

impl CircuitBreakerConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            reset_timeout: DEFAULT_RESET_TIMEOUT,
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Sets the number of consecutive failures that opens the circuit.
    ///
    /// Default: 3
    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Sets how long the circuit stays open before a probe is allowed.
    ///
    /// Default: 30 seconds
    pub fn reset_timeout(mut self, timeout: Duration) -> Self {
        self.reset_timeout = timeout;
        self
    }

    /// Give this breaker a human-readable name for observability.
    ///
    /// Default: `<unnamed>`
    pub fn name<N: Into<String>>(mut self, n: N) -> Self {
        self.name = n.into();
        self
    }

    /// Registers a callback for state transitions, called with `(from, to)`.
    ///
    /// # Example
    /// ```rust
    /// use resilient_api_circuitbreaker::{CircuitBreakerConfig, CircuitState};
    ///
    /// let breaker = CircuitBreakerConfig::builder()
    ///     .on_state_transition(|from, to| {
    ///         if to == CircuitState::Open {
    ///             eprintln!("upstream degraded ({:?} -> {:?})", from, to);
    ///         }
    ///     })
    ///     .build();
    /// ```
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners.on(move |event: &CircuitBreakerEvent| {
            if let CircuitBreakerEvent::StateTransition {
                from_state,
                to_state,
                ..
            } = event
            {
                f(*from_state, *to_state);
            }
        });
        self
    }

    /// Registers a callback for permitted calls, called with the current state.
    pub fn on_call_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners.on(move |event: &CircuitBreakerEvent| {
            if let CircuitBreakerEvent::CallPermitted { state, .. } = event {
                f(*state);
            }
        });
        self
    }

    /// Registers a callback for calls rejected without reaching the upstream.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.on(move |event: &CircuitBreakerEvent| {
            if matches!(event, CircuitBreakerEvent::CallRejected { .. }) {
                f();
            }
        });
        self
    }

    /// Registers a callback for recorded successes.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners.on(move |event: &CircuitBreakerEvent| {
            if let CircuitBreakerEvent::SuccessRecorded { state, .. } = event {
                f(*state);
            }
        });
        self
    }

    /// Registers a callback for recorded failures, called with the state the
    /// failure was recorded in and the new consecutive failure count.
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState, u32) + Send + Sync + 'static,
    {
        self.event_listeners.on(move |event: &CircuitBreakerEvent| {
            if let CircuitBreakerEvent::FailureRecorded {
                state,
                consecutive_failures,
                ..
            } = event
            {
                f(*state, *consecutive_failures);
            }
        });
        self
    }

    pub(crate) fn into_config(self) -> CircuitBreakerConfig {
        if self.failure_threshold == 0 {
            panic!("failure_threshold must be at least 1");
        }

        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            reset_timeout: self.reset_timeout,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }

    /// Builds the circuit breaker.
    ///
    /// # Panics
    ///
    /// Panics if `failure_threshold` is zero.
    pub fn build(self) -> crate::CircuitBreaker {
        crate::CircuitBreaker::new(self.into_config())
    }
}

impl Default for CircuitBreakerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
