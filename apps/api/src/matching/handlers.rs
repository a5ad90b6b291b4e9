//! Axum route handlers for the Match API.

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::errors::AppError;
use crate::matching::{match_candidates, MatchReport};
use crate::retrieval::handlers::query_context;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    pub jd_text: String,
    #[serde(default)]
    pub jd_embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub k: Option<usize>,
}

/// POST /api/v1/match
///
/// Full pipeline: hybrid retrieval → sub-score assessment → deterministic
/// score → re-rank. Per-candidate failures are listed, not fatal.
pub async fn handle_match(
    State(state): State<AppState>,
    Json(request): Json<MatchRequest>,
) -> Result<Json<MatchReport>, AppError> {
    let query = query_context(&state, &request.jd_text, request.jd_embedding)?;
    let k = request.k.unwrap_or_else(|| state.config.default_k());

    let report = match_candidates(&state.pipeline, state.assessor.as_ref(), &query, k).await?;

    Ok(Json(report))
}
