//! Client-credentials token provider.
//!
//! [`TokenProvider`] holds the single bearer token used for authenticated
//! upstream calls. Reads are lock-free through [`ArcSwap`]; refreshes are
//! serialized by a mutex. Callers that queued behind an exchange take its
//! outcome, success or failure, instead of starting one of their own.
//!
//! # Example
//!
//! ```ignore
//! use trolley_auth::{TokenProvider, TokenProviderConfig};
//!
//! let config = TokenProviderConfig::new(endpoint).with_credentials(id, secret);
//! let provider = TokenProvider::new(config)?;
//!
//! // Refreshes only when the stored token is missing or about to expire.
//! let token = provider.ensure_token().await?;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use serde::{Deserialize, Deserializer, Serialize, de::IgnoredAny};
use tokio::sync::Mutex;

use crate::config::TokenProviderConfig;
use crate::error::AuthError;

/// A bearer token and its optional expiry.
///
/// Tokens issued without `expires_in` never expire from the provider's point
/// of view and are reused until the process restarts.
#[derive(Debug, Clone, Default)]
pub struct Token {
    value: String,
    expires_at: Option<Instant>,
}

impl Token {
    /// Creates a token that expires `expires_in` from now, or never.
    ///
    /// A lifetime too large to represent is treated as no expiry.
    pub fn new(value: impl Into<String>, expires_in: Option<Duration>) -> Self {
        Self {
            value: value.into(),
            expires_at: expires_in.and_then(|ttl| Instant::now().checked_add(ttl)),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Whether the token can be used without a refresh, given the skew.
    pub fn is_fresh(&self, skew: Duration) -> bool {
        if self.value.is_empty() {
            return false;
        }
        match self.expires_at {
            None => true,
            Some(at) => Instant::now()
                .checked_add(skew)
                .is_some_and(|deadline| deadline < at),
        }
    }
}

/// Snapshot of the provider state, reported on the readiness endpoint.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TokenStatus {
    pub configured: bool,
    pub has_token: bool,
    /// Seconds until expiry, `None` when the token never expires.
    pub expires_in_secs: Option<u64>,
    /// Number of successful exchanges since startup.
    pub exchanges: u64,
}

/// Body of a successful `client_credentials` response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default, deserialize_with = "lenient_expires_in")]
    expires_in: Option<u64>,
}

/// `expires_in` as token servers actually send it.
#[derive(Deserialize)]
#[serde(untagged)]
enum ExpiresIn {
    Seconds(u64),
    Text(String),
    Unreadable(IgnoredAny),
}

/// Accepts `3600` and `"3600"`; anything else means "no expiry".
fn lenient_expires_in<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<ExpiresIn>::deserialize(deserializer)?;
    Ok(match raw {
        Some(ExpiresIn::Seconds(secs)) => Some(secs),
        Some(ExpiresIn::Text(text)) => text.trim().parse().ok(),
        Some(ExpiresIn::Unreadable(_)) | None => None,
    })
}

/// Outcome of the most recent exchange, shared with callers that queued
/// behind it.
#[derive(Default)]
struct RefreshState {
    last: Option<Result<String, AuthError>>,
}

/// Holds and refreshes the bearer token for upstream calls.
pub struct TokenProvider {
    http_client: reqwest::Client,
    config: TokenProviderConfig,
    current: ArcSwap<Token>,
    refresh_lock: Mutex<RefreshState>,
    /// Completed exchange attempts, successful or not.
    attempts: AtomicU64,
    exchanges: AtomicU64,
}

impl TokenProvider {
    /// Creates a provider with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: TokenProviderConfig) -> Result<Self, AuthError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(config, http_client))
    }

    /// Creates a provider that shares an existing HTTP client.
    pub fn with_client(config: TokenProviderConfig, http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            config,
            current: ArcSwap::from_pointee(Token::default()),
            refresh_lock: Mutex::new(RefreshState::default()),
            attempts: AtomicU64::new(0),
            exchanges: AtomicU64::new(0),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_enabled()
    }

    /// Returns the stored token value, empty before the first exchange.
    pub fn current_token(&self) -> String {
        self.current.load().value().to_string()
    }

    /// Returns a usable token, exchanging credentials only when needed.
    ///
    /// Callers arriving while a refresh is in flight wait for it and then
    /// return its result, including its error. Only a caller that arrives
    /// after an attempt has finished starts a new one.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotConfigured`] when no endpoint is set, or the
    /// exchange error when a refresh was needed and failed.
    pub async fn ensure_token(&self) -> Result<String, AuthError> {
        if let Some(token) = self.fresh_token() {
            return Ok(token);
        }
        if !self.is_configured() {
            return Err(AuthError::NotConfigured);
        }

        let seen = self.attempts.load(Ordering::Acquire);
        let mut state = self.refresh_lock.lock().await;

        if let Some(token) = self.fresh_token() {
            tracing::trace!("Token refreshed by concurrent caller");
            return Ok(token);
        }
        if self.attempts.load(Ordering::Acquire) != seen
            && let Some(outcome) = &state.last
        {
            tracing::trace!("Reusing outcome of concurrent token exchange");
            return outcome.clone();
        }

        self.attempt(&mut state).await
    }

    /// Forces a new exchange regardless of the stored token.
    ///
    /// On failure the previously stored token is kept.
    ///
    /// # Errors
    ///
    /// Returns the exchange error.
    pub async fn refresh(&self) -> Result<String, AuthError> {
        let mut state = self.refresh_lock.lock().await;
        self.attempt(&mut state).await
    }

    pub fn status(&self) -> TokenStatus {
        let token = self.current.load();
        TokenStatus {
            configured: self.is_configured(),
            has_token: !token.is_empty(),
            expires_in_secs: token
                .expires_at()
                .map(|at| at.saturating_duration_since(Instant::now()).as_secs()),
            exchanges: self.exchanges.load(Ordering::Relaxed),
        }
    }

    fn fresh_token(&self) -> Option<String> {
        let token = self.current.load();
        token
            .is_fresh(self.config.expiry_skew)
            .then(|| token.value().to_string())
    }

    /// Runs one exchange and publishes its outcome to queued callers.
    async fn attempt(&self, state: &mut RefreshState) -> Result<String, AuthError> {
        let outcome = self.exchange().await;
        state.last = Some(outcome.clone());
        self.attempts.fetch_add(1, Ordering::Release);
        outcome
    }

    /// Performs the exchange. Callers must hold `refresh_lock`.
    async fn exchange(&self) -> Result<String, AuthError> {
        let endpoint = self.config.endpoint.as_ref().ok_or(AuthError::NotConfigured)?;

        tracing::debug!(endpoint = %endpoint, "Requesting client_credentials token");

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];

        let response = self
            .http_client
            .post(endpoint.as_str())
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(endpoint = %endpoint, error = %e, "OAuth failed");
                AuthError::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(endpoint = %endpoint, status = status.as_u16(), "OAuth failed");
            return Err(AuthError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: TokenResponse = response.json().await.map_err(|e| {
            tracing::error!(endpoint = %endpoint, error = %e, "OAuth response could not be parsed");
            AuthError::InvalidResponse(e.to_string())
        })?;

        if payload.access_token.is_empty() {
            return Err(AuthError::InvalidResponse(
                "access_token is empty".to_string(),
            ));
        }

        let token = Token::new(
            payload.access_token,
            payload.expires_in.map(Duration::from_secs),
        );
        let value = token.value().to_string();

        tracing::info!(
            token = %token_prefix(&value),
            expires_in_secs = ?payload.expires_in,
            "Bearer token generated"
        );

        self.current.store(Arc::new(token));
        self.exchanges.fetch_add(1, Ordering::Relaxed);

        Ok(value)
    }
}

/// Shortened token for logs.
fn token_prefix(token: &str) -> String {
    let prefix: String = token.chars().take(6).collect();
    format!("{prefix}...")
}
