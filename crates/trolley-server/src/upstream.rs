//! HTTP client for the third-party e-commerce API.
//!
//! Every call carries the `x-api-key` header; calls marked
//! [`AuthMode::Bearer`] also carry the provider's bearer token. Responses are
//! returned as JSON for the routes to pass through verbatim.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::http::{Method, header::CONTENT_TYPE};
use serde_json::Value;
use tracing::{debug, instrument, warn};
use trolley_auth::{AuthError, TokenProvider};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Errors returned by [`UpstreamClient::call`].
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// Upstream answered with a non-2xx status.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// The request never produced a response.
    #[error("{0}")]
    Transport(String),

    /// No bearer token could be obtained for an authenticated call.
    #[error("{0}")]
    Auth(#[from] AuthError),
}

impl UpstreamError {
    /// Upstream status code, when the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Auth(e) => e.status(),
            Self::Transport(_) => None,
        }
    }

    fn from_status(status: u16) -> Self {
        Self::Status {
            status,
            message: format!("Request failed with status code {status}"),
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Transport(format!("Upstream request timed out: {err}"))
        } else if err.is_connect() {
            Self::Transport(format!("Failed to connect to upstream: {err}"))
        } else {
            Self::Transport(format!("Upstream request failed: {err}"))
        }
    }
}

/// Which credentials a call needs besides the API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    ApiKey,
    Bearer,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamBody {
    Empty,
    Json(Value),
    /// Forwarded byte for byte as `text/plain`.
    Text(Bytes),
}

/// Percent-encoded query string, built parameter by parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryString(String);

impl QueryString {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `name=value`, percent-encoding the value.
    #[must_use]
    pub fn param(self, name: &str, value: &str) -> Self {
        let encoded = urlencoding::encode(value);
        self.raw(name, &encoded)
    }

    /// Appends `name=value` with `value` used exactly as given.
    #[must_use]
    pub fn raw(mut self, name: &str, encoded_value: &str) -> Self {
        if !self.0.is_empty() {
            self.0.push('&');
        }
        self.0.push_str(name);
        self.0.push('=');
        self.0.push_str(encoded_value);
        self
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One call to the upstream API.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamRequest {
    pub method: Method,
    pub path: String,
    pub query: QueryString,
    pub body: UpstreamBody,
    pub auth: AuthMode,
}

impl UpstreamRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: QueryString::new(),
            body: UpstreamBody::Empty,
            auth: AuthMode::ApiKey,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn query(mut self, query: QueryString) -> Self {
        self.query = query;
        self
    }

    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = UpstreamBody::Json(body);
        self
    }

    #[must_use]
    pub fn text(mut self, body: impl Into<Bytes>) -> Self {
        self.body = UpstreamBody::Text(body.into());
        self
    }

    #[must_use]
    pub fn bearer(mut self) -> Self {
        self.auth = AuthMode::Bearer;
        self
    }

    /// Full URL under `base_url`.
    pub fn url(&self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');
        if self.query.is_empty() {
            format!("{base}{}", self.path)
        } else {
            format!("{base}{}?{}", self.path, self.query.as_str())
        }
    }
}

/// Client for the upstream API.
pub struct UpstreamClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    tokens: Arc<TokenProvider>,
}

impl UpstreamClient {
    pub fn new(
        http_client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        tokens: Arc<TokenProvider>,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            tokens,
        }
    }

    pub fn tokens(&self) -> &Arc<TokenProvider> {
        &self.tokens
    }

    /// Sends `request` and returns the response body as JSON.
    ///
    /// A 2xx body that is not JSON is returned as a JSON string; an empty
    /// body becomes `null`.
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn call(&self, request: UpstreamRequest) -> Result<Value, UpstreamError> {
        let url = request.url(&self.base_url);

        let mut builder = self
            .http_client
            .request(request.method.clone(), &url)
            .header(API_KEY_HEADER, &self.api_key);

        if request.auth == AuthMode::Bearer {
            let token = self.tokens.ensure_token().await.inspect_err(|e| {
                warn!(error = %e, "No bearer token available for upstream call");
            })?;
            builder = builder.bearer_auth(token);
        }

        builder = match request.body {
            UpstreamBody::Empty => builder,
            UpstreamBody::Json(body) => builder.json(&body),
            UpstreamBody::Text(body) => builder.header(CONTENT_TYPE, "text/plain").body(body),
        };

        let started = Instant::now();
        let response = builder.send().await?;
        let status = response.status();
        let payload = response.bytes().await?;

        debug!(
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            payload_bytes = payload.len(),
            "Upstream call completed"
        );

        if !status.is_success() {
            return Err(UpstreamError::from_status(status.as_u16()));
        }

        Ok(decode_body(&payload))
    }
}

fn decode_body(payload: &[u8]) -> Value {
    if payload.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(payload)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(payload).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_string_encodes_values() {
        let query = QueryString::new()
            .param("cardNumber", "9710084009641420")
            .param("query", "full cream milk & bread");
        assert_eq!(
            query.as_str(),
            "cardNumber=9710084009641420&query=full%20cream%20milk%20%26%20bread"
        );
    }

    #[test]
    fn test_query_string_raw_is_untouched() {
        let query = QueryString::new().raw("query", "%3Arelevance%3Aa");
        assert_eq!(query.as_str(), "query=%3Arelevance%3Aa");
    }

    #[test]
    fn test_url_joins_base_path_and_query() {
        let request = UpstreamRequest::get("/dsl/baskets/transactions");
        assert_eq!(
            request.url("https://api.example.com/"),
            "https://api.example.com/dsl/baskets/transactions"
        );

        let request = UpstreamRequest::get("/pamphlets")
            .query(QueryString::new().param("storeIdentifier", "2701"));
        assert_eq!(
            request.url("https://api.example.com"),
            "https://api.example.com/pamphlets?storeIdentifier=2701"
        );
    }

    #[test]
    fn test_request_builders() {
        let request = UpstreamRequest::post("/pay").json(json!({})).bearer();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.auth, AuthMode::Bearer);
        assert_eq!(request.body, UpstreamBody::Json(json!({})));

        let request = UpstreamRequest::post("/tx").text("<basket/>");
        assert_eq!(request.auth, AuthMode::ApiKey);
        assert_eq!(request.body, UpstreamBody::Text(Bytes::from_static(b"<basket/>")));

        let raw = Bytes::from_static(&[b'o', b'k', 0xff]);
        let request = UpstreamRequest::post("/tx").text(raw.clone());
        assert_eq!(request.body, UpstreamBody::Text(raw));
    }

    #[test]
    fn test_decode_body() {
        assert_eq!(decode_body(br#"{"a":1}"#), json!({"a": 1}));
        assert_eq!(decode_body(b"plain text"), json!("plain text"));
        assert_eq!(decode_body(b""), Value::Null);
        assert_eq!(decode_body(b"  \n"), Value::Null);
    }

    #[test]
    fn test_status_error_message() {
        let err = UpstreamError::from_status(404);
        assert_eq!(err.to_string(), "Request failed with status code 404");
        assert_eq!(err.status(), Some(404));

        let err = UpstreamError::from(AuthError::NotConfigured);
        assert_eq!(err.status(), None);
        assert_eq!(err.to_string(), "OAuth endpoint is not configured");
    }
}
