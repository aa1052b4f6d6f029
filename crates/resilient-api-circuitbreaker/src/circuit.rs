use crate::config::CircuitBreakerConfig;
use crate::events::CircuitBreakerEvent;
#[cfg(feature = "metrics")]
use metrics::{counter, gauge};
use std::time::Duration;
use tokio::time::Instant;

/// Represents the state of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
#[repr(u8)]
pub enum CircuitState {
    /// The circuit is closed and calls are allowed.
    Closed = 0,
    /// The circuit is open and calls are rejected.
    Open = 1,
    /// The circuit is half-open and exactly one probe call is allowed.
    HalfOpen = 2,
}

impl CircuitState {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "Closed",
            CircuitState::Open => "Open",
            CircuitState::HalfOpen => "HalfOpen",
        }
    }
}

/// Point-in-time view of a breaker, for diagnostics.
///
/// Taking a snapshot never changes the breaker: an open circuit whose probe
/// time has passed is still reported as `Open` until the next gating check.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BreakerSnapshot {
    /// Name of the breaker instance.
    pub name: String,
    /// Current state.
    pub state: CircuitState,
    /// Failures recorded since the last reset.
    pub consecutive_failures: u32,
    /// Failures needed to open the circuit.
    pub failure_threshold: u32,
    /// When the most recent failure was recorded.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub last_failure_at: Option<Instant>,
    /// When an open circuit becomes eligible for a probe.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub next_probe_at: Option<Instant>,
    /// Remaining wait before the probe, zero once it is due.
    pub time_until_probe: Option<Duration>,
    /// Whether a half-open probe is currently outstanding.
    pub probe_in_flight: bool,
}

/// The breaker state machine. Always accessed under the breaker's mutex.
#[derive(Debug)]
pub(crate) struct Circuit {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure_at: Option<Instant>,
    next_probe_at: Option<Instant>,
    probe_in_flight: bool,
}

impl Default for Circuit {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            last_failure_at: None,
            next_probe_at: None,
            probe_in_flight: false,
        }
    }
}

impl Circuit {
    pub(crate) fn state(&self) -> CircuitState {
        self.state
    }

    pub(crate) fn snapshot(&self, config: &CircuitBreakerConfig) -> BreakerSnapshot {
        let now = Instant::now();
        BreakerSnapshot {
            name: config.name.clone(),
            state: self.state,
            consecutive_failures: self.consecutive_failures,
            failure_threshold: config.failure_threshold,
            last_failure_at: self.last_failure_at,
            next_probe_at: self.next_probe_at,
            time_until_probe: self
                .next_probe_at
                .map(|at| at.saturating_duration_since(now)),
            probe_in_flight: self.probe_in_flight,
        }
    }

    /// Moves an open circuit to half-open once its probe time has passed.
    pub(crate) fn check_probe(&mut self, config: &CircuitBreakerConfig) -> CircuitState {
        if self.state == CircuitState::Open {
            if let Some(next_probe_at) = self.next_probe_at {
                if Instant::now() >= next_probe_at {
                    self.transition_to(CircuitState::HalfOpen, config);
                }
            }
        }
        self.state
    }

    /// True iff a call arriving now would be rejected.
    pub(crate) fn rejects_calls(&self) -> bool {
        match self.state {
            CircuitState::Closed => false,
            CircuitState::Open => true,
            CircuitState::HalfOpen => self.probe_in_flight,
        }
    }

    /// Gating decision. Returns `Some(is_probe)` when the call may proceed.
    pub(crate) fn try_acquire(&mut self, config: &CircuitBreakerConfig) -> Option<bool> {
        let decision = match self.check_probe(config) {
            CircuitState::Closed => Some(false),
            CircuitState::Open => None,
            CircuitState::HalfOpen if self.probe_in_flight => None,
            CircuitState::HalfOpen => {
                self.probe_in_flight = true;
                Some(true)
            }
        };

        match decision {
            Some(_) => config
                .event_listeners
                .emit(&CircuitBreakerEvent::CallPermitted {
                    name: config.name.clone(),
                    timestamp: std::time::Instant::now(),
                    state: self.state,
                }),
            None => {
                config
                    .event_listeners
                    .emit(&CircuitBreakerEvent::CallRejected {
                        name: config.name.clone(),
                        timestamp: std::time::Instant::now(),
                        state: self.state,
                    });

                #[cfg(feature = "metrics")]
                counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "rejected").increment(1);
            }
        }

        decision
    }

    /// Gives back an unused probe slot.
    pub(crate) fn release_probe(&mut self) {
        if self.state == CircuitState::HalfOpen {
            self.probe_in_flight = false;
        }
    }

    pub(crate) fn record_success(&mut self, config: &CircuitBreakerConfig) {
        config
            .event_listeners
            .emit(&CircuitBreakerEvent::SuccessRecorded {
                name: config.name.clone(),
                timestamp: std::time::Instant::now(),
                state: self.state,
            });

        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "success").increment(1);

        self.transition_to(CircuitState::Closed, config);
        self.consecutive_failures = 0;
        self.last_failure_at = None;
        self.next_probe_at = None;
        self.probe_in_flight = false;
    }

    pub(crate) fn record_failure(&mut self, config: &CircuitBreakerConfig) {
        let now = Instant::now();
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_failure_at = Some(now);

        config
            .event_listeners
            .emit(&CircuitBreakerEvent::FailureRecorded {
                name: config.name.clone(),
                timestamp: std::time::Instant::now(),
                state: self.state,
                consecutive_failures: self.consecutive_failures,
            });

        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "failure").increment(1);

        #[cfg(feature = "tracing")]
        tracing::warn!(
            breaker = %config.name,
            failures = self.consecutive_failures,
            threshold = config.failure_threshold,
            state = self.state.as_str(),
            "remote call failure recorded"
        );

        let reopen = self.state == CircuitState::HalfOpen
            || self.consecutive_failures >= config.failure_threshold;
        if reopen {
            self.next_probe_at = Some(now + config.reset_timeout);
            self.probe_in_flight = false;
            self.transition_to(CircuitState::Open, config);
        }
    }

    pub(crate) fn force_open(&mut self, config: &CircuitBreakerConfig) {
        let now = Instant::now();
        self.last_failure_at = Some(now);
        self.next_probe_at = Some(now + config.reset_timeout);
        self.probe_in_flight = false;
        self.transition_to(CircuitState::Open, config);
    }

    pub(crate) fn reset(&mut self, config: &CircuitBreakerConfig) {
        self.transition_to(CircuitState::Closed, config);
        self.consecutive_failures = 0;
        self.last_failure_at = None;
        self.next_probe_at = None;
        self.probe_in_flight = false;
    }

    fn transition_to(&mut self, state: CircuitState, config: &CircuitBreakerConfig) {
        if self.state == state {
            return;
        }

        let from_state = self.state;

        config
            .event_listeners
            .emit(&CircuitBreakerEvent::StateTransition {
                name: config.name.clone(),
                timestamp: std::time::Instant::now(),
                from_state,
                to_state: state,
            });

        #[cfg(feature = "tracing")]
        match state {
            CircuitState::Open => tracing::warn!(
                breaker = %config.name,
                from = from_state.as_str(),
                retry_in_ms = config.reset_timeout.as_millis() as u64,
                "circuit opened; remote calls are blocked"
            ),
            _ => tracing::info!(
                breaker = %config.name,
                from = from_state.as_str(),
                to = state.as_str(),
                "circuit state transition"
            ),
        }

        #[cfg(feature = "metrics")]
        {
            counter!(
                "circuitbreaker_transitions_total",
                "circuitbreaker" => config.name.clone(),
                "from" => from_state.as_str(),
                "to" => state.as_str()
            )
            .increment(1);

            gauge!("circuitbreaker_state", "circuitbreaker" => config.name.clone())
                .set(state as u8 as f64);
        }

        self.state = state;
    }
}
