//! `reqwest`-backed transport.

use crate::{ApiError, Method, RequestSpec};
use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::Service;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP transport sending [`RequestSpec`]s to one base address.
///
/// Non-2xx answers become [`ApiError::Remote`], with the message taken from
/// the body's `message` field when there is one. Connect errors and timeouts
/// become [`ApiError::Transport`]; bodies that are not JSON become
/// [`ApiError::Decode`]. An empty successful body decodes to `null`.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Arc<str>,
    bearer_token: Option<Arc<str>>,
}

impl HttpTransport {
    /// Returns a builder for the given base address.
    pub fn builder(base_url: impl Into<String>) -> HttpTransportBuilder {
        HttpTransportBuilder::new(base_url)
    }

    /// The base address requests are resolved against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, spec: &RequestSpec) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), spec.path)
    }

    async fn send(
        client: reqwest::Client,
        url: String,
        bearer_token: Option<Arc<str>>,
        spec: RequestSpec,
    ) -> Result<Value, ApiError> {
        let method = match spec.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut request = client.request(method, &url);
        if !spec.query.is_empty() {
            request = request.query(&spec.query);
        }
        if let Some(body) = &spec.body {
            request = request.json(body);
        }
        if let Some(token) = &bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<Value>(&bytes)
                .ok()
                .and_then(|body| body.get("message")?.as_str().map(str::to_owned))
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("unknown status")
                        .to_string()
                });
            return Err(ApiError::Remote {
                status: status.as_u16(),
                message,
            });
        }

        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

impl Service<RequestSpec> for HttpTransport {
    type Response = Value;
    type Error = ApiError;
    type Future = BoxFuture<'static, Result<Value, ApiError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, spec: RequestSpec) -> Self::Future {
        let url = self.url_for(&spec);
        Box::pin(Self::send(
            self.client.clone(),
            url,
            self.bearer_token.clone(),
            spec,
        ))
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.bearer_token.is_some())
            .finish()
    }
}

/// Builder for [`HttpTransport`].
pub struct HttpTransportBuilder {
    base_url: String,
    timeout: Duration,
    bearer_token: Option<String>,
}

impl HttpTransportBuilder {
    fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            bearer_token: None,
        }
    }

    /// Sets the per-request timeout. An elapsed timeout is a transport error.
    ///
    /// Default: 10 seconds
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sends `Authorization: Bearer <token>` with every request.
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Builds the transport.
    pub fn build(self) -> Result<HttpTransport, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(HttpTransport {
            client,
            base_url: self.base_url.into(),
            bearer_token: self.bearer_token.map(Into::into),
        })
    }
}
