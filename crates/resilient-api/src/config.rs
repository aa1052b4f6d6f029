use crate::ClientError;
use resilient_api_cache::{DEFAULT_NAMESPACE, DEFAULT_TTL};
use resilient_api_circuitbreaker::{DEFAULT_FAILURE_THRESHOLD, DEFAULT_RESET_TIMEOUT};
use resilient_api_executor::DEFAULT_REQUEST_TIMEOUT;
use resilient_api_scheduler::{
    OverlapPolicy, DEFAULT_CATEGORIES_INTERVAL, DEFAULT_HEALTH_INTERVAL, DEFAULT_PRODUCTS_INTERVAL,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Everything needed to build an [`ApiClient`](crate::ApiClient).
///
/// Durations are written as milliseconds. Every field except `base_url` has
/// a default, so a minimal JSON config is:
///
/// ```json
/// { "base_url": "https://api.example.com/api/v1" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Name used in logs, metrics and events.
    pub name: String,
    /// Base URL every request path is joined to.
    pub base_url: String,
    /// Bearer token sent with every request.
    pub bearer_token: Option<String>,
    /// Per-request timeout of the HTTP client.
    #[serde(rename = "timeout_ms", with = "millis")]
    pub timeout: Duration,
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,
    /// How long an open circuit waits before letting a probe through.
    #[serde(rename = "reset_timeout_ms", with = "millis")]
    pub reset_timeout: Duration,
    /// Freshness window of cached responses.
    #[serde(rename = "cache_ttl_ms", with = "millis")]
    pub cache_ttl: Duration,
    /// Prefix of every cache record.
    pub cache_namespace: String,
    /// Directory of the on-disk cache. Without it responses are cached in
    /// memory only.
    pub cache_dir: Option<PathBuf>,
    /// Interval of the product listing refresh.
    #[serde(rename = "products_interval_ms", with = "millis")]
    pub products_interval: Duration,
    /// Interval of the category refresh.
    #[serde(rename = "categories_interval_ms", with = "millis")]
    pub categories_interval: Duration,
    /// Interval of the health probe.
    #[serde(rename = "health_interval_ms", with = "millis")]
    pub health_interval: Duration,
    /// Whether a tick may start while the previous run is still going.
    pub overlap: OverlapPolicy,
}

impl ClientConfig {
    /// Default configuration for `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Parses a JSON config.
    pub fn from_json(json: &str) -> Result<Self, ClientError> {
        let config: Self = serde_json::from_str(json).map_err(ClientError::InvalidConfig)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the values the component builders would reject.
    pub fn validate(&self) -> Result<(), ClientError> {
        let problem = if self.base_url.trim().is_empty() {
            "base_url must not be empty"
        } else if self.failure_threshold == 0 {
            "failure_threshold must be greater than zero"
        } else if self.cache_ttl.is_zero() {
            "cache_ttl_ms must be greater than zero"
        } else if self.products_interval.is_zero()
            || self.categories_interval.is_zero()
            || self.health_interval.is_zero()
        {
            "job intervals must be greater than zero"
        } else {
            return Ok(());
        };
        Err(ClientError::Validation(problem))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: String::from("storefront"),
            base_url: String::new(),
            bearer_token: None,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            reset_timeout: DEFAULT_RESET_TIMEOUT,
            cache_ttl: DEFAULT_TTL,
            cache_namespace: String::from(DEFAULT_NAMESPACE),
            cache_dir: None,
            products_interval: DEFAULT_PRODUCTS_INTERVAL,
            categories_interval: DEFAULT_CATEGORIES_INTERVAL,
            health_interval: DEFAULT_HEALTH_INTERVAL,
            overlap: OverlapPolicy::default(),
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
