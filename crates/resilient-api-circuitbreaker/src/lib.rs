//! Circuit breaker guarding a remote service.
//!
//! A circuit breaker prevents cascading failures by counting consecutive
//! failed remote calls and refusing new calls for a while once a threshold is
//! reached.
//!
//! ## States
//! - **Closed**: normal operation, every call passes through
//! - **Open**: tripped, calls are rejected immediately until the probe time
//! - **Half-Open**: exactly one probe call is let through to test recovery
//!
//! The open → half-open move is lazy: nothing runs on a timer. The move
//! happens in [`CircuitBreaker::check_probe`], which every gating method calls
//! before deciding.
//!
//! ## Usage
//!
//! ```rust
//! use resilient_api_circuitbreaker::{CircuitBreaker, CircuitState};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let breaker = CircuitBreaker::builder()
//!     .name("storefront-api")
//!     .failure_threshold(3)
//!     .reset_timeout(Duration::from_secs(30))
//!     .build();
//!
//! if let Some(permit) = breaker.try_acquire() {
//!     let ok = true; // perform the remote call here
//!     if ok {
//!         permit.record_success();
//!     } else {
//!         permit.record_failure();
//!     }
//! }
//!
//! assert_eq!(breaker.state(), CircuitState::Closed);
//! # }
//! ```
//!
//! ### Wrapping a future
//!
//! ```rust
//! use resilient_api_circuitbreaker::{CircuitBreaker, CircuitBreakerError};
//!
//! # async fn example() {
//! let breaker = CircuitBreaker::default();
//! match breaker.call(async { Ok::<_, std::io::Error>("pong") }).await {
//!     Ok(body) => println!("upstream said {}", body),
//!     Err(CircuitBreakerError::OpenCircuit) => eprintln!("upstream unavailable"),
//!     Err(CircuitBreakerError::Inner(e)) => eprintln!("call failed: {}", e),
//! }
//! # }
//! ```
//!
//! ## Feature Flags
//! - `metrics`: counters and a state gauge via the `metrics` crate
//! - `tracing`: structured logs via the `tracing` crate
//! - `serde`: `Serialize` for `CircuitState` and `BreakerSnapshot`

use crate::circuit::Circuit;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;

pub use circuit::{BreakerSnapshot, CircuitState};
pub use config::{
    CircuitBreakerConfig, CircuitBreakerConfigBuilder, DEFAULT_FAILURE_THRESHOLD,
    DEFAULT_RESET_TIMEOUT,
};
pub use error::CircuitBreakerError;
pub use events::CircuitBreakerEvent;

mod circuit;
mod config;
mod error;
mod events;

struct Shared {
    circuit: Mutex<Circuit>,
    config: CircuitBreakerConfig,
}

/// Handle to a circuit breaker.
///
/// Cloning is cheap and every clone observes the same state machine, so a
/// single breaker can guard all calls to one upstream.
#[derive(Clone)]
pub struct CircuitBreaker {
    shared: Arc<Shared>,
}

impl CircuitBreaker {
    /// Creates a breaker from a finished configuration.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                circuit: Mutex::new(Circuit::default()),
                config,
            }),
        }
    }

    /// Returns a new configuration builder.
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// The configuration this breaker was built with.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.shared.config
    }

    /// Performs the lazy open → half-open transition if the probe time has
    /// passed, and returns the resulting state.
    pub fn check_probe(&self) -> CircuitState {
        self.shared.circuit.lock().check_probe(&self.shared.config)
    }

    /// Returns true iff a call arriving now must be rejected.
    ///
    /// Calls [`check_probe`](Self::check_probe) first, so an open circuit whose
    /// reset timeout has elapsed reports `false` and is half-open afterwards.
    pub fn is_open(&self) -> bool {
        let mut circuit = self.shared.circuit.lock();
        circuit.check_probe(&self.shared.config);
        circuit.rejects_calls()
    }

    /// Asks permission for one remote call.
    ///
    /// Returns `None` when the call must be rejected. In the half-open state
    /// the first permit claims the single probe slot; dropping it without
    /// recording an outcome gives the slot back.
    pub fn try_acquire(&self) -> Option<CallPermit> {
        let probe = self
            .shared
            .circuit
            .lock()
            .try_acquire(&self.shared.config)?;

        #[cfg(feature = "tracing")]
        if probe {
            tracing::debug!(breaker = %self.shared.config.name, "permitting half-open probe");
        }

        Some(CallPermit {
            breaker: self.clone(),
            probe,
            recorded: false,
        })
    }

    /// Records a successful remote call: closes the circuit and clears all
    /// failure bookkeeping.
    pub fn on_success(&self) {
        self.shared
            .circuit
            .lock()
            .record_success(&self.shared.config);
    }

    /// Records a failed remote call, opening the circuit at the threshold or
    /// when a half-open probe fails.
    pub fn on_failure(&self) {
        self.shared
            .circuit
            .lock()
            .record_failure(&self.shared.config);
    }

    /// Runs `fut` if the breaker permits it and records its outcome.
    pub async fn call<F, T, E>(&self, fut: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: Future<Output = Result<T, E>>,
    {
        let permit = self.try_acquire().ok_or(CircuitBreakerError::OpenCircuit)?;
        match fut.await {
            Ok(value) => {
                permit.record_success();
                Ok(value)
            }
            Err(e) => {
                permit.record_failure();
                Err(CircuitBreakerError::Inner(e))
            }
        }
    }

    /// Current state, without performing the probe check.
    pub fn state(&self) -> CircuitState {
        self.shared.circuit.lock().state()
    }

    /// Read-only snapshot for diagnostics.
    pub fn snapshot(&self) -> BreakerSnapshot {
        self.shared.circuit.lock().snapshot(&self.shared.config)
    }

    /// Forces the circuit open, as if the threshold had just been reached.
    pub fn force_open(&self) {
        self.shared.circuit.lock().force_open(&self.shared.config);
    }

    /// Resets the circuit to closed and clears all counts.
    pub fn reset(&self) {
        self.shared.circuit.lock().reset(&self.shared.config);
    }

    /// HTTP status a health endpoint should report for this breaker.
    ///
    /// - Closed: 200
    /// - HalfOpen: 200, accepting a probe
    /// - Open: 503
    pub fn http_status(&self) -> u16 {
        match self.state() {
            CircuitState::Closed | CircuitState::HalfOpen => 200,
            CircuitState::Open => 503,
        }
    }

    /// "healthy", "degraded" or "unhealthy".
    pub fn health_status(&self) -> &'static str {
        match self.state() {
            CircuitState::Closed => "healthy",
            CircuitState::HalfOpen => "degraded",
            CircuitState::Open => "unhealthy",
        }
    }

    fn release_probe(&self) {
        self.shared.circuit.lock().release_probe();
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        CircuitBreakerConfigBuilder::new().build()
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.shared.config.name)
            .field("state", &self.state())
            .finish()
    }
}

/// Permission for a single remote call.
///
/// Record the call's outcome with [`record_success`](Self::record_success) or
/// [`record_failure`](Self::record_failure). A permit dropped without an
/// outcome (for example because the caller was served from cache) records
/// nothing and frees the probe slot if it held one.
#[must_use = "dropping a permit records no outcome"]
pub struct CallPermit {
    breaker: CircuitBreaker,
    probe: bool,
    recorded: bool,
}

impl CallPermit {
    /// Whether this permit is the half-open probe.
    pub fn is_probe(&self) -> bool {
        self.probe
    }

    /// Records a successful call.
    pub fn record_success(mut self) {
        self.recorded = true;
        self.breaker.on_success();
    }

    /// Records a failed call.
    pub fn record_failure(mut self) {
        self.recorded = true;
        self.breaker.on_failure();
    }
}

impl Drop for CallPermit {
    fn drop(&mut self) {
        if !self.recorded && self.probe {
            self.breaker.release_probe();
        }
    }
}

impl std::fmt::Debug for CallPermit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallPermit")
            .field("probe", &self.probe)
            .finish()
    }
}
