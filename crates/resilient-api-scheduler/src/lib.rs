//! Recurring background jobs for a resilient API client.
//!
//! A [`Scheduler`] runs named jobs on fixed intervals. Jobs keep the response
//! cache warm ahead of user requests and periodically probe the upstream so an
//! open circuit breaker gets its chance to close again.
//!
//! # Semantics
//!
//! - A job fires once when registered, then every `interval`.
//! - Registering a name that is already taken cancels the old job first.
//! - Each job is driven by its own tokio task with a cancellation token.
//!   Cancelling stops future ticks; it never interrupts a running invocation.
//! - Handler errors and panics are logged and counted, never propagated.
//! - By default a slow invocation may still be running when the next tick
//!   fires; [`OverlapPolicy::Skip`] skips such ticks instead.
//!
//! # Examples
//!
//! ```rust,no_run
//! use resilient_api_cache::{CacheConfig, MemoryStorage};
//! use resilient_api_executor::{ExecutorConfig, HttpTransport};
//! use resilient_api_scheduler::{RefreshPlan, Scheduler};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = HttpTransport::builder("https://api.example.com/api/v1").build()?;
//! let executor = Arc::new(
//!     ExecutorConfig::builder()
//!         .name("storefront")
//!         .build(transport, CacheConfig::builder().build(MemoryStorage::new())),
//! );
//!
//! let scheduler = Scheduler::builder()
//!     .name("storefront-cron")
//!     .refresh(executor, RefreshPlan::default())
//!     .on_job_failed(|job, error| eprintln!("{} failed: {}", job, error))
//!     .build();
//!
//! scheduler.start()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Feature Flags
//! - `metrics`: job run counters via the `metrics` crate
//! - `tracing`: structured logs via the `tracing` crate

pub use error::SchedulerError;
pub use events::SchedulerEvent;
pub use job::{JobStatus, OverlapPolicy};
pub use refresh::{
    RefreshError, RefreshPlan, DEFAULT_CATEGORIES_INTERVAL, DEFAULT_HEALTH_INTERVAL,
    DEFAULT_PRODUCTS_INTERVAL, POLL_HEALTH, REFRESH_CATEGORIES, REFRESH_PRODUCTS,
};
pub use scheduler::{Scheduler, SchedulerBuilder};

mod error;
mod events;
mod job;
mod refresh;
mod scheduler;
