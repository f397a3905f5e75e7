//! Token provider configuration.

use std::time::Duration;

use url::Url;

/// Configuration for the client-credentials [`TokenProvider`](crate::TokenProvider).
#[derive(Debug, Clone)]
pub struct TokenProviderConfig {
    /// Token endpoint. `None` disables token refresh entirely.
    pub endpoint: Option<Url>,

    /// OAuth client id sent in the grant.
    pub client_id: String,

    /// OAuth client secret sent in the grant.
    pub client_secret: String,

    /// HTTP request timeout for the exchange (default: 30 seconds).
    pub request_timeout: Duration,

    /// A token is refreshed once it is this close to expiry (default: 30 seconds).
    pub expiry_skew: Duration,
}

impl Default for TokenProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            client_id: String::new(),
            client_secret: String::new(),
            request_timeout: Duration::from_secs(30),
            expiry_skew: Duration::from_secs(30),
        }
    }
}

impl TokenProviderConfig {
    /// Creates a configuration for the given token endpoint.
    #[must_use]
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint: Some(endpoint),
            ..Self::default()
        }
    }

    /// Creates a configuration with no token endpoint.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Sets the client id and secret.
    #[must_use]
    pub fn with_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.client_id = client_id.into();
        self.client_secret = client_secret.into();
        self
    }

    /// Sets the HTTP request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets how long before expiry a token is considered stale.
    #[must_use]
    pub fn with_expiry_skew(mut self, skew: Duration) -> Self {
        self.expiry_skew = skew;
        self
    }

    /// Whether a token endpoint is configured.
    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }
}
