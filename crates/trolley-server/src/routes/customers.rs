//! Customer validation, login and OTP verification.

use axum::{
    extract::{Query, State, rejection::QueryRejection},
    response::Response,
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{BRAND_ZA_LOWER, fetch, forward, json_response};
use crate::error::BffError;
use crate::server::AppState;
use crate::upstream::{QueryString, UpstreamRequest};

#[derive(Debug, Default, Deserialize)]
pub struct CardParams {
    #[serde(rename = "cardNumber")]
    pub card_number: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "cardNumber")]
    pub card_number: Option<String>,
    pub reference: Option<String>,
    pub otp: Option<String>,
}

pub fn validate_key(card_number: &str) -> String {
    format!("validate:{card_number}")
}

/// Body of the upstream OTP verification call.
pub fn verify_payload(params: &VerifyParams) -> Value {
    json!({
        "target": {
            "type": "SMS",
            "identifier": params.card_number.as_deref().unwrap_or_default(),
            "reference": params.reference.as_deref().unwrap_or_default(),
        },
        "otp": params.otp.as_deref().unwrap_or_default(),
    })
}

/// `GET /backend/customers/validate?cardNumber=`
///
/// API key only. Successful responses are cached per card number.
pub async fn validate(
    State(state): State<AppState>,
    query: Result<Query<CardParams>, QueryRejection>,
) -> Result<Response, BffError> {
    let Query(params) = query?;
    let card_number = params.card_number.unwrap_or_default();
    let key = (!card_number.is_empty()).then(|| validate_key(&card_number));

    if let Some(key) = &key
        && let Some(hit) = state.cache.get(key)
    {
        return Ok(json_response(&hit));
    }

    let request = UpstreamRequest::get(format!("{BRAND_ZA_LOWER}/users/validate"))
        .query(QueryString::new().param("cardNumber", &card_number));
    let body = fetch(&state, request, "customer validation").await?;

    let response = json_response(&body);
    if let Some(key) = key {
        state.cache.set(&key, body);
    }
    Ok(response)
}

/// `GET /backend/customers/login?cardNumber=`
pub async fn login(
    State(state): State<AppState>,
    query: Result<Query<CardParams>, QueryRejection>,
) -> Result<Response, BffError> {
    let Query(params) = query?;
    let card_number = params.card_number.unwrap_or_default();

    let request = UpstreamRequest::get(format!("{BRAND_ZA_LOWER}/users/login"))
        .query(QueryString::new().param("query", &card_number))
        .bearer();
    forward(&state, request, "customer login").await
}

/// `GET|POST /backend/customers/verify?cardNumber=&reference=&otp=`
///
/// Always verified upstream with a JSON POST.
pub async fn verify(
    State(state): State<AppState>,
    query: Result<Query<VerifyParams>, QueryRejection>,
) -> Result<Response, BffError> {
    let Query(params) = query?;

    let request = UpstreamRequest::post(format!("{BRAND_ZA_LOWER}/otp/loginbymobile/verify"))
        .json(verify_payload(&params))
        .bearer();
    forward(&state, request, "customer verify").await
}
