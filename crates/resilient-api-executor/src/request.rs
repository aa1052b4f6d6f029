use serde::Serialize;
use serde_json::Value;
use std::fmt;
use url::form_urlencoded;

/// HTTP method of a remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// Read.
    Get,
    /// Create.
    Post,
    /// Replace.
    Put,
    /// Remove.
    Delete,
}

impl Method {
    /// Upper-case method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }

    /// Whether the method only reads.
    pub fn is_read(&self) -> bool {
        matches!(self, Method::Get)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Description of one remote call, relative to the upstream base address.
///
/// # Examples
///
/// ```
/// use resilient_api_executor::RequestSpec;
///
/// let spec = RequestSpec::get("products/category")
///     .query("size", 8)
///     .query("categoryId", 2);
/// assert_eq!(spec.cache_key(), "GET products/category?categoryId=2&size=8");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestSpec {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the base address, without a leading slash.
    pub path: String,
    /// Query pairs in insertion order.
    pub query: Vec<(String, String)>,
    /// Optional JSON body.
    pub body: Option<Value>,
}

impl RequestSpec {
    /// Creates a request with no query and no body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            method,
            path: path.trim_start_matches('/').to_string(),
            query: Vec::new(),
            body: None,
        }
    }

    /// A `GET` request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// A `POST` request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// A `PUT` request.
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    /// A `DELETE` request.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Appends a query pair.
    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    /// Sets the JSON body.
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Stable key for this request: method, path and the form-encoded query
    /// pairs sorted by name then value. The body is not part of the key.
    pub fn cache_key(&self) -> String {
        let mut key = format!("{} {}", self.method, self.path);
        if !self.query.is_empty() {
            let mut pairs: Vec<_> = self.query.iter().collect();
            pairs.sort();
            let encoded = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs)
                .finish();
            key.push('?');
            key.push_str(&encoded);
        }
        key
    }
}

impl fmt::Display for RequestSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} /{}", self.method, self.path)
    }
}
