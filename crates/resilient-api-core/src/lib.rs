//! Core infrastructure for resilient-api.
//!
//! Shared pieces used by every component of the API-access layer:
//! - Event system for observability ([`events`])
//! - Wall-clock helpers for persisted timestamps ([`time`])

pub mod events;
pub mod time;

pub use events::{EventListeners, EventOrigin, ResilienceEvent};
