use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, middleware, routing::get};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer,
};
use trolley_auth::TokenProvider;

use crate::{
    cache::{CachePolicy, ResponseCache},
    config::AppConfig,
    handlers, middleware as app_middleware, routes,
    upstream::UpstreamClient,
};

/// Shared handles injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<UpstreamClient>,
    pub cache: ResponseCache,
}

impl AppState {
    pub fn new(upstream: Arc<UpstreamClient>, cache: ResponseCache) -> Self {
        Self { upstream, cache }
    }

    /// Wires the token provider, upstream client and cache from configuration.
    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        if cfg.upstream.base_url.trim().is_empty() {
            tracing::warn!("upstream.base_url is empty; every backend call will fail");
        }

        let http_client = reqwest::Client::builder()
            .timeout(cfg.upstream_timeout())
            .build()?;

        let tokens = Arc::new(TokenProvider::with_client(
            cfg.token_provider_config(),
            http_client.clone(),
        ));
        let upstream = Arc::new(UpstreamClient::new(
            http_client,
            cfg.upstream.base_url.clone(),
            cfg.upstream.api_key.clone(),
            tokens,
        ));
        let cache = ResponseCache::with_policy(CachePolicy::from(&cfg.cache));

        Ok(Self::new(upstream, cache))
    }

    pub fn tokens(&self) -> &Arc<TokenProvider> {
        self.upstream.tokens()
    }
}

pub struct TrolleyServer {
    addr: SocketAddr,
    app: Router,
}

pub fn build_app(state: AppState, cfg: &AppConfig) -> Router {
    let body_limit = cfg.server.body_limit_bytes;

    let mut router = Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .merge(routes::backend_routes());

    if let Some(dir) = &cfg.static_files.harness_dir {
        tracing::info!(dir = %dir, "Serving harness pages at /harness");
        router = router.nest_service("/harness", ServeDir::new(dir));
    }
    if let Some(dir) = &cfg.static_files.frontend_dir {
        tracing::info!(dir = %dir, "Serving frontend pages at /");
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .with_state(state)
        // Middleware stack (order: request id -> compression/cors/trace -> body limit)
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    let req_id = req
                        .extensions()
                        .get::<axum::http::HeaderValue>()
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Builds the app and starts the initial token exchange in the
    /// background; startup never waits on the token endpoint.
    pub async fn build(self) -> anyhow::Result<TrolleyServer> {
        let state = AppState::from_config(&self.config)?;
        spawn_initial_token_refresh(Arc::clone(state.tokens()));

        let app = build_app(state, &self.config);

        Ok(TrolleyServer {
            addr: self.addr,
            app,
        })
    }
}

fn spawn_initial_token_refresh(tokens: Arc<TokenProvider>) {
    if !tokens.is_configured() {
        return;
    }
    tokio::spawn(async move {
        if let Err(e) = tokens.ensure_token().await {
            tracing::error!(error = %e, "Initial token refresh failed; bearer routes will retry on demand");
        }
    });
}

impl TrolleyServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("Smart Trolley BFF listening on http://{}/", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
