use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use trolley_auth::TokenStatus;

use crate::cache::CacheStats;
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
}

#[derive(Serialize)]
pub struct ReadyResponse<'a> {
    status: &'a str,
    token: TokenStatus,
    cache: CacheStats,
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// Always ready: API-key routes work without a token, so token state is
/// reported for diagnosis only.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(ReadyResponse {
            status: "ready",
            token: state.tokens().status(),
            cache: state.cache.stats(),
        }),
    )
}
