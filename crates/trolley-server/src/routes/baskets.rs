//! Basket calculation and commit. The basket document is forwarded as plain
//! text, untouched.

use axum::{body::Bytes, extract::State, response::Response};

use super::forward;
use crate::error::BffError;
use crate::server::AppState;
use crate::upstream::UpstreamRequest;

const BASKET_TRANSACTIONS: &str = "/dsl/baskets/transactions";

/// `POST /backend/baskets/calculate`
pub async fn calculate(State(state): State<AppState>, body: Bytes) -> Result<Response, BffError> {
    let request = UpstreamRequest::post(BASKET_TRANSACTIONS)
        .text(body)
        .bearer();
    forward(&state, request, "basket calculate").await
}

/// `POST /backend/baskets/commit`
pub async fn commit(State(state): State<AppState>, body: Bytes) -> Result<Response, BffError> {
    let request = UpstreamRequest::post(BASKET_TRANSACTIONS)
        .text(body)
        .bearer();
    forward(&state, request, "basket commit").await
}
