//! Router boundary errors.
//!
//! Every failure is reported to the trolley app the same way: HTTP 500 with
//! `{"error": "<message>"}`. The cause is only distinguished in the logs.

use axum::{
    Json,
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::upstream::UpstreamError;

#[derive(Debug, thiserror::Error)]
pub enum BffError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// Query string could not be read.
    #[error("Invalid query string: {0}")]
    InvalidQuery(String),

    /// Request body could not be forwarded.
    #[error("Invalid request body: {0}")]
    InvalidBody(String),
}

impl From<QueryRejection> for BffError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidQuery(rejection.body_text())
    }
}

impl IntoResponse for BffError {
    fn into_response(self) -> Response {
        let body = json!({ "error": self.to_string() });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
