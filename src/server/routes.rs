use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::error::{ServerError, ServerResult};
use super::state::AppState;
use crate::recommender::{Recommendation, effective_top_k};

#[derive(Debug, Clone, Deserialize)]
pub struct RecommendRequest {
    pub query: String,
    /// Absent or 0 falls back to the configured default
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub balance: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendResponse {
    pub query: String,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Serialize)]
struct TraceRecord<'a> {
    query: &'a str,
    top_k: usize,
    balance: bool,
    results: &'a [Recommendation],
}

#[inline]
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[inline]
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RecommendRequest>,
) -> ServerResult<Json<RecommendResponse>> {
    let top_k = effective_top_k(request.top_k, state.default_top_k);
    let balance = request.balance.unwrap_or(state.balance_by_default);
    debug!(
        "Recommend request: top_k={}, balance={}, query={:?}",
        top_k, balance, request.query
    );

    let worker_state = Arc::clone(&state);
    let query = request.query.clone();
    let recommendations = tokio::task::spawn_blocking(move || {
        let results = worker_state.engine.recommend(&query, top_k, balance)?;

        if let Some(trace) = &worker_state.trace {
            let record = TraceRecord {
                query: &query,
                top_k,
                balance,
                results: &results,
            };
            if let Err(e) = trace.append(&record) {
                warn!("Failed to write trace: {}", e);
            }
        }

        Ok::<_, crate::RecommenderError>(results)
    })
    .await
    .map_err(|e| ServerError::Internal(format!("Recommendation task failed: {e}")))??;

    Ok(Json(RecommendResponse {
        query: request.query,
        recommendations,
    }))
}
