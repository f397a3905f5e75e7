//! Digital payment cards and payment.

use axum::{body::Bytes, extract::State, response::Response};
use serde_json::{Value, json};

use super::forward;
use crate::error::BffError;
use crate::server::AppState;
use crate::upstream::UpstreamRequest;

/// An empty body is sent upstream as `{}`.
pub fn payment_body(body: &Bytes) -> Result<Value, BffError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(json!({}));
    }
    serde_json::from_slice(body).map_err(|e| BffError::InvalidBody(e.to_string()))
}

/// `POST /backend/payment/cards`
pub async fn cards(State(state): State<AppState>) -> Result<Response, BffError> {
    let request = UpstreamRequest::post("/api/v1/payment/listcards")
        .json(json!({}))
        .bearer();
    forward(&state, request, "payment cards list").await
}

/// `POST /backend/payment/pay`
pub async fn pay(State(state): State<AppState>, body: Bytes) -> Result<Response, BffError> {
    let request = UpstreamRequest::post("/api/v1/payment/pay")
        .json(payment_body(&body)?)
        .bearer();
    forward(&state, request, "payment").await
}
