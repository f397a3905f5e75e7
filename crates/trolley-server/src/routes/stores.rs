use axum::{
    extract::{Query, State, rejection::QueryRejection},
    response::Response,
};
use serde::Deserialize;

use super::{BRAND_ZA, forward};
use crate::error::BffError;
use crate::server::AppState;
use crate::upstream::{QueryString, UpstreamRequest};

#[derive(Debug, Default, Deserialize)]
pub struct LeafletParams {
    pub storecode: Option<String>,
}

/// `GET /backend/stores/leaflets?storecode=`
///
/// Public catalogue data: API key only.
pub async fn leaflets(
    State(state): State<AppState>,
    query: Result<Query<LeafletParams>, QueryRejection>,
) -> Result<Response, BffError> {
    let Query(params) = query?;
    let store_code = params.storecode.unwrap_or_default();

    tracing::info!(storecode = %store_code, "Requesting leaflets");

    let request = UpstreamRequest::get(format!("{BRAND_ZA}/pamphlets"))
        .query(QueryString::new().param("storeIdentifier", &store_code));
    forward(&state, request, "store leaflets").await
}
