//! Transaction history and till slips.

use axum::{body::Bytes, extract::State, response::Response};

use super::{BRAND_ZA, forward};
use crate::error::BffError;
use crate::server::AppState;
use crate::upstream::UpstreamRequest;

/// `POST /backend/transactions/list`
pub async fn list(State(state): State<AppState>, body: Bytes) -> Result<Response, BffError> {
    let request = UpstreamRequest::post(format!("{BRAND_ZA}/transactions"))
        .text(body)
        .bearer();
    forward(&state, request, "list transactions").await
}

/// `POST /backend/transactions/tillslip`
pub async fn tillslip(State(state): State<AppState>, body: Bytes) -> Result<Response, BffError> {
    let request = UpstreamRequest::post(format!("{BRAND_ZA}/tillslip"))
        .text(body)
        .bearer();
    forward(&state, request, "till slip").await
}
