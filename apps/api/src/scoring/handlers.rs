//! Axum route handlers for the Scoring API.

use axum::Json;

use crate::errors::AppError;
use crate::scoring::{breakdown, ScoreBreakdown, ScoreInputs};

/// POST /api/v1/score
///
/// Deterministic final score for caller-supplied sub-scores. No model call.
pub async fn handle_score(
    Json(inputs): Json<ScoreInputs>,
) -> Result<Json<ScoreBreakdown>, AppError> {
    Ok(Json(breakdown(&inputs)?))
}
