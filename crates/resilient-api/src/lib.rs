//! Resilient storefront API client.
//!
//! `resilient-api` puts the pieces of this workspace together behind one
//! type, [`ApiClient`]:
//!
//! - **Circuit breaker** ([`circuitbreaker`]): after a run of consecutive
//!   failures, calls stop reaching the upstream until a probe succeeds
//! - **Durable cache** ([`cache`]): responses are stored with a timestamp,
//!   served while fresh and used as a fallback once stale
//! - **Executor** ([`executor`]): runs one request through breaker, cache,
//!   transport and fallback
//! - **Scheduler** ([`scheduler`]): refreshes popular listings and probes the
//!   upstream in the background
//!
//! # Example
//!
//! ```rust,no_run
//! use resilient_api::{endpoints, ApiClient, ClientConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_json(r#"{
//!     "base_url": "https://api.example.com/api/v1",
//!     "cache_dir": "/var/cache/storefront"
//! }"#)?;
//! let client = ApiClient::connect(config).await?;
//! client.start_scheduler()?;
//!
//! let categories = client.call(&endpoints::categories()).await?;
//! println!("{} ({:?})", categories.payload, categories.origin);
//!
//! let status = client.system_status().await;
//! println!("{}", serde_json::to_string_pretty(&status)?);
//! # Ok(())
//! # }
//! ```
//!
//! # Feature Flags
//! - `tracing` (default): structured logs from every component
//! - `metrics`: counters and histograms via the `metrics` crate

pub use client::ApiClient;
pub use config::ClientConfig;
pub use error::ClientError;
pub use status::{BreakerStatus, SystemStatus};
pub use storage::ClientStorage;

pub use resilient_api_cache as cache;
pub use resilient_api_circuitbreaker as circuitbreaker;
pub use resilient_api_executor as executor;
pub use resilient_api_scheduler as scheduler;

pub use resilient_api_executor::{ApiError, ApiResponse, RequestSpec, ResponseOrigin};

pub mod endpoints;

mod client;
mod config;
mod error;
mod status;
mod storage;
