use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, time::Duration};
use trolley_auth::TokenProviderConfig;
use url::Url;

/// Errors raised while building or validating [`AppConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config build error: {0}")]
    Build(#[from] config::ConfigError),

    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// Third-party e-commerce API
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Client-credentials token endpoint
    #[serde(default)]
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    /// Static roots for the customer pages and the demo harness
    #[serde(default, rename = "static")]
    pub static_files: StaticConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be > 0".into()));
        }
        if self.upstream.timeout_ms == 0 {
            return Err(ConfigError::Invalid("upstream.timeout_ms must be > 0".into()));
        }
        if self.cache.max_entries == Some(0) {
            return Err(ConfigError::Invalid("cache.max_entries must be > 0".into()));
        }
        if self.cache.ttl_secs == Some(0) {
            return Err(ConfigError::Invalid("cache.ttl_secs must be > 0".into()));
        }
        if self.logging.filter_level().is_none() {
            return Err(ConfigError::Invalid(format!(
                "logging.level must be one of {LOG_LEVELS:?}, got {:?}",
                self.logging.level
            )));
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream.timeout_ms)
    }

    /// Builds the token provider settings.
    ///
    /// A missing or malformed endpoint is not fatal: it is logged and token
    /// refresh is disabled, so only the API-key routes keep working.
    pub fn token_provider_config(&self) -> TokenProviderConfig {
        let endpoint = match self.oauth.endpoint.as_deref().map(str::trim) {
            None | Some("") => {
                tracing::error!("OAuth endpoint is not defined; bearer routes are disabled");
                return TokenProviderConfig::disabled();
            }
            Some(raw) => raw,
        };

        match Url::parse(endpoint) {
            Ok(url) => TokenProviderConfig::new(url)
                .with_credentials(&self.oauth.client_id, &self.oauth.client_secret)
                .with_request_timeout(self.upstream_timeout()),
            Err(e) => {
                tracing::error!(endpoint, error = %e, "OAuth endpoint is not a valid URL; bearer routes are disabled");
                TokenProviderConfig::disabled()
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    3000
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL every upstream path is appended to
    #[serde(default)]
    pub base_url: String,
    /// Sent as `x-api-key` on every upstream call
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_upstream_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_upstream_timeout_ms() -> u64 {
    30_000
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            timeout_ms: default_upstream_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OAuthConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
}

/// Response cache policy. Both limits are off by default: the cache is
/// unbounded and entries never expire.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheConfig {
    #[serde(default)]
    pub ttl_secs: Option<u64>,
    #[serde(default)]
    pub max_entries: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    /// Served at `/`
    #[serde(default)]
    pub frontend_dir: Option<String>,
    /// Served at `/harness`
    #[serde(default)]
    pub harness_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
/// Accepted `logging.level` values, including the names older `.env` files
/// use (`all`, `fatal`, `mark`).
const LOG_LEVELS: [&str; 9] = [
    "all", "trace", "debug", "info", "mark", "warn", "error", "fatal", "off",
];

impl LoggingConfig {
    /// The `tracing` filter level for the configured name, case-insensitive.
    pub fn filter_level(&self) -> Option<&'static str> {
        match self.level.trim().to_ascii_lowercase().as_str() {
            "all" | "trace" => Some("trace"),
            "debug" => Some("debug"),
            "info" | "mark" => Some("info"),
            "warn" => Some("warn"),
            "error" | "fatal" => Some("error"),
            "off" => Some("off"),
            _ => None,
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::{AppConfig, ConfigError};
    use config::{Config, Environment, File};
    use std::env;
    use std::path::PathBuf;

    /// Flat variable names used by the original `.env` files, mapped to keys.
    const LEGACY_VARS: &[(&str, &str)] = &[
        ("baseURL", "upstream.base_url"),
        ("apikey", "upstream.api_key"),
        ("oauthendpoint", "oauth.endpoint"),
        ("oauthclientid", "oauth.client_id"),
        ("oauthsecret", "oauth.client_secret"),
        ("logginglevel", "logging.level"),
    ];

    /// Loads configuration.
    ///
    /// Precedence, lowest first: defaults, TOML file, `TROLLEY__*` variables,
    /// legacy flat variables (`baseURL`, `apikey`, `PORT`, ...).
    pub fn load_config(path: Option<&str>) -> Result<AppConfig, ConfigError> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or("trolley.toml"));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., TROLLEY__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("TROLLEY")
                .try_parsing(true)
                .separator("__"),
        );
        for (var, key) in LEGACY_VARS {
            builder = builder.set_override_option(*key, non_empty_var(var))?;
        }
        builder = builder.set_override_option("server.port", legacy_port()?)?;

        let merged: AppConfig = builder.build()?.try_deserialize()?;
        merged.validate()?;
        Ok(merged)
    }

    fn non_empty_var(name: &str) -> Option<String> {
        env::var(name).ok().filter(|v| !v.trim().is_empty())
    }

    fn legacy_port() -> Result<Option<i64>, ConfigError> {
        match non_empty_var("PORT").or_else(|| non_empty_var("port")) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| ConfigError::Invalid(format!("PORT must be a number, got {raw:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.server.port, 3000);
        assert_eq!(cfg.upstream.timeout_ms, 30_000);
        assert!(cfg.cache.ttl_secs.is_none());
        assert!(cfg.cache.max_entries.is_none());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut cfg = AppConfig::default();
        cfg.server.port = 0;
        assert!(cfg.validate().unwrap_err().to_string().contains("server.port"));

        let mut cfg = AppConfig::default();
        cfg.logging.level = "chatty".into();
        assert!(cfg.validate().unwrap_err().to_string().contains("logging.level"));

        let mut cfg = AppConfig::default();
        cfg.cache.max_entries = Some(0);
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.cache.ttl_secs = Some(0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_legacy_log_level_names_are_mapped() {
        let mut cfg = AppConfig::default();
        for (name, level) in [
            ("all", "trace"),
            ("FATAL", "error"),
            ("mark", "info"),
            ("Debug", "debug"),
            ("off", "off"),
        ] {
            cfg.logging.level = name.into();
            assert!(cfg.validate().is_ok(), "{name} should be accepted");
            assert_eq!(cfg.logging.filter_level(), Some(level));
        }
    }

    #[test]
    fn test_missing_oauth_endpoint_disables_refresh() {
        let cfg = AppConfig::default();
        assert!(!cfg.token_provider_config().is_enabled());

        let mut cfg = AppConfig::default();
        cfg.oauth.endpoint = Some("not a url".into());
        assert!(!cfg.token_provider_config().is_enabled());
    }

    #[test]
    fn test_oauth_endpoint_carries_credentials() {
        let mut cfg = AppConfig::default();
        cfg.oauth.endpoint = Some("https://auth.example.com/token".into());
        cfg.oauth.client_id = "id".into();
        cfg.oauth.client_secret = "secret".into();

        let provider = cfg.token_provider_config();
        assert!(provider.is_enabled());
        assert_eq!(provider.client_id, "id");
        assert_eq!(provider.client_secret, "secret");
        assert_eq!(provider.request_timeout, Duration::from_millis(30_000));
    }

    #[test]
    fn test_addr_falls_back_to_unspecified_host() {
        let mut cfg = AppConfig::default();
        cfg.server.host = "not-an-ip".into();
        cfg.server.port = 8123;
        assert_eq!(cfg.addr().to_string(), "0.0.0.0:8123");
    }
}
