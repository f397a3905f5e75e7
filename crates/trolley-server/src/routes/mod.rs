//! Inbound `/backend/...` routes.
//!
//! Each route maps to exactly one upstream call. Only customer validation and
//! exact-identifier product lookups are cached; everything else is a straight
//! pass-through. Failures of any kind answer 500 with `{"error": ...}`.
//!
//! ```text
//! request ─▶ cache key? ──hit──▶ 200 cached JSON
//!                │ miss
//!                ▼
//!          UpstreamClient::call ──ok──▶ cache write? ─▶ 200 upstream JSON
//!                │ err
//!                ▼
//!          500 {"error": message}
//! ```

pub mod baskets;
pub mod customers;
pub mod payment;
pub mod products;
pub mod promotions;
pub mod stores;
pub mod transactions;

use axum::{
    Json, Router,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::Value;

use crate::error::BffError;
use crate::server::AppState;
use crate::upstream::UpstreamRequest;

/// Upstream path prefix. The upstream is inconsistent about the country
/// segment's case, so both spellings are kept as the API expects them.
pub(crate) const BRAND_ZA: &str = "/dsl/brands/checkers/countries/ZA";
pub(crate) const BRAND_ZA_LOWER: &str = "/dsl/brands/checkers/countries/za";

pub fn backend_routes() -> Router<AppState> {
    Router::new()
        .route("/backend/customers/validate", get(customers::validate))
        .route("/backend/customers/login", get(customers::login))
        .route(
            "/backend/customers/verify",
            get(customers::verify).post(customers::verify),
        )
        .route("/backend/products/search", get(products::search))
        .route(
            "/backend/promotions/offersforyou",
            get(promotions::offers_for_you),
        )
        .route("/backend/promotions/ranked", get(promotions::ranked))
        .route("/backend/promotions/add", post(promotions::add))
        .route("/backend/baskets/calculate", post(baskets::calculate))
        .route("/backend/baskets/commit", post(baskets::commit))
        .route("/backend/payment/cards", post(payment::cards))
        .route("/backend/payment/pay", post(payment::pay))
        .route("/backend/transactions/list", post(transactions::list))
        .route("/backend/transactions/tillslip", post(transactions::tillslip))
        .route("/backend/stores/leaflets", get(stores::leaflets))
}

/// Calls upstream and logs failures under `operation`.
pub(crate) async fn fetch(
    state: &AppState,
    request: UpstreamRequest,
    operation: &'static str,
) -> Result<Value, BffError> {
    state.upstream.call(request).await.map_err(|e| {
        tracing::error!(
            operation,
            upstream_status = ?e.status(),
            error = %e,
            "Upstream call failed"
        );
        BffError::from(e)
    })
}

/// Calls upstream and returns its JSON verbatim.
pub(crate) async fn forward(
    state: &AppState,
    request: UpstreamRequest,
    operation: &'static str,
) -> Result<Response, BffError> {
    let body = fetch(state, request, operation).await?;
    Ok(Json(body).into_response())
}

pub(crate) fn json_response(body: &Value) -> Response {
    Json(body).into_response()
}
