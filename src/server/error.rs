use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::warn;

use crate::RecommenderError;

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("{0}")]
    Recommendation(#[from] RecommenderError),

    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    #[inline]
    fn into_response(self) -> Response {
        let detail = format!("Recommendation error: {self}");
        warn!("Request failed: {}", detail);

        (StatusCode::BAD_REQUEST, Json(json!({ "detail": detail }))).into_response()
    }
}
