//! Resilient request execution against one upstream API.
//!
//! [`ResilientExecutor`] ties together a [`CircuitBreaker`] guarding the
//! upstream, a [`DurableCache`] of earlier responses, and a transport that
//! performs the actual call. Callers get a payload whenever one is
//! obtainable: fresh from the network, fresh from the cache, or as a stale
//! fallback when the upstream is failing.
//!
//! The transport is any `tower::Service<RequestSpec, Response = Value, Error =
//! ApiError>`. [`HttpTransport`] is the `reqwest`-backed implementation.
//!
//! # Examples
//!
//! ```no_run
//! use resilient_api_cache::{CacheConfig, MemoryStorage};
//! use resilient_api_executor::{ExecutorConfig, HttpTransport, RequestSpec};
//!
//! # async fn example() -> Result<(), resilient_api_executor::ApiError> {
//! let transport = HttpTransport::builder("https://api.example.com/api/v1").build()?;
//! let executor = ExecutorConfig::builder()
//!     .name("storefront")
//!     .build(transport, CacheConfig::builder().build(MemoryStorage::new()));
//!
//! let spec = RequestSpec::get("categories");
//! let response = executor.execute(&spec, Some("categories"), false).await?;
//! if response.is_degraded() {
//!     eprintln!("showing cached categories");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Feature Flags
//! - `metrics`: call counters and a duration histogram via the `metrics` crate
//! - `tracing`: a span per call plus structured logs via the `tracing` crate
//!
//! [`CircuitBreaker`]: resilient_api_circuitbreaker::CircuitBreaker
//! [`DurableCache`]: resilient_api_cache::DurableCache

pub use config::{ExecutorConfig, ExecutorConfigBuilder};
pub use error::ApiError;
pub use events::ExecutorEvent;
pub use executor::{ApiResponse, ResilientExecutor, ResponseOrigin};
pub use http::{HttpTransport, HttpTransportBuilder, DEFAULT_REQUEST_TIMEOUT};
pub use request::{Method, RequestSpec};

mod config;
mod error;
mod events;
mod executor;
mod http;
mod request;
