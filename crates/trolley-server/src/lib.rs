//! Backend-for-frontend for the Smart Trolley in-store app.
//!
//! Proxies the trolley's `/backend/...` calls to the third-party e-commerce
//! API, adding the API key and bearer token, and caching customer validation
//! and exact product lookups in memory.

pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod routes;
pub mod server;
pub mod upstream;

pub use cache::{CacheEntry, CachePolicy, CacheStats, ResponseCache};
pub use config::{AppConfig, CacheConfig, ConfigError, OAuthConfig, ServerConfig, UpstreamConfig};
pub use error::BffError;
pub use observability::init_tracing;
pub use server::{AppState, ServerBuilder, TrolleyServer, build_app};
pub use upstream::{AuthMode, QueryString, UpstreamClient, UpstreamError, UpstreamRequest};
