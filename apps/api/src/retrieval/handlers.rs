//! Axum route handlers for the Corpus and Retrieval API.

use std::collections::{BTreeMap, HashSet};

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db;
use crate::errors::AppError;
use crate::retrieval::evaluation::{evaluate, RetrievalMetrics, DEFAULT_EVAL_K};
use crate::retrieval::store::CorpusStats;
use crate::retrieval::types::{CandidateRecord, FusedResult, QueryContext};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

/// A candidate as submitted over HTTP. `embedding` may be omitted, in which
/// case the configured embedder derives it from `normalized_text`.
#[derive(Debug, Deserialize)]
pub struct CandidateInput {
    pub id: String,
    pub normalized_text: String,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub structured_fields: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct IndexRequest {
    pub candidates: Vec<CandidateInput>,
}

#[derive(Debug, Deserialize)]
pub struct RetrieveRequest {
    pub query_text: String,
    #[serde(default)]
    pub query_embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RetrieveResponse {
    pub k: usize,
    pub results: Vec<FusedResult>,
}

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub query_text: String,
    #[serde(default)]
    pub query_embedding: Option<Vec<f32>>,
    pub relevant_ids: Vec<String>,
    #[serde(default)]
    pub k_values: Option<Vec<usize>>,
}

#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub total_relevant: usize,
    pub retrieved: usize,
    pub metrics: Vec<RetrievalMetrics>,
}

// ────────────────────────────────────────────────────────────────────────────
// Shared helpers
// ────────────────────────────────────────────────────────────────────────────

impl CandidateInput {
    fn into_record(self, state: &AppState) -> CandidateRecord {
        let embedding = self
            .embedding
            .unwrap_or_else(|| state.embedder.embed(&self.normalized_text));
        CandidateRecord {
            id: self.id,
            normalized_text: self.normalized_text,
            embedding,
            structured_fields: self.structured_fields,
        }
    }
}

/// Builds the query side of a retrieval, embedding `text` when no vector is given.
pub fn query_context(
    state: &AppState,
    text: &str,
    embedding: Option<Vec<f32>>,
) -> Result<QueryContext, AppError> {
    if text.trim().is_empty() {
        return Err(AppError::Validation("query text cannot be empty".to_string()));
    }
    let embedding = embedding.unwrap_or_else(|| state.embedder.embed(text));
    Ok(QueryContext::new(text, embedding))
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/corpus
pub async fn handle_corpus_stats(State(state): State<AppState>) -> Json<CorpusStats> {
    Json(state.pipeline.store().stats())
}

/// POST /api/v1/corpus
///
/// Replaces the whole corpus. The batch is validated and indexed first; with a
/// database configured it is then persisted, and only after that published.
pub async fn handle_index(
    State(state): State<AppState>,
    Json(request): Json<IndexRequest>,
) -> Result<Json<CorpusStats>, AppError> {
    let records: Vec<CandidateRecord> = request
        .candidates
        .into_iter()
        .map(|c| c.into_record(&state))
        .collect();

    let stats = match &state.db {
        None => state.pipeline.index(records).await?,
        Some(pool) => {
            let writer = state.pipeline.store().writer().await;
            let staged = writer.stage_rebuild(records).await?;
            db::replace_candidates(pool, staged.records()).await?;
            writer.publish(staged)
        }
    };

    Ok(Json(stats))
}

/// POST /api/v1/corpus/candidates
pub async fn handle_add_candidate(
    State(state): State<AppState>,
    Json(input): Json<CandidateInput>,
) -> Result<Json<CorpusStats>, AppError> {
    let record = input.into_record(&state);

    let stats = match &state.db {
        None => state.pipeline.add(record).await?,
        Some(pool) => {
            let id = record.id.clone();
            let writer = state.pipeline.store().writer().await;
            let staged = writer.stage_add(record).await?;
            let stored = staged.get(&id)?;
            db::insert_candidate(pool, &stored).await?;
            writer.publish(staged)
        }
    };

    Ok(Json(stats))
}

/// GET /api/v1/candidates/:id
pub async fn handle_get_candidate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CandidateRecord>, AppError> {
    let record = state.pipeline.get(&id)?;
    Ok(Json(CandidateRecord::clone(&record)))
}

/// POST /api/v1/retrieve
///
/// Fused top-`k` (default `2 × TOP_N_CANDIDATES`). No scoring.
pub async fn handle_retrieve(
    State(state): State<AppState>,
    Json(request): Json<RetrieveRequest>,
) -> Result<Json<RetrieveResponse>, AppError> {
    let query = query_context(&state, &request.query_text, request.query_embedding)?;
    let k = request.k.unwrap_or_else(|| state.config.default_k());

    let results = state.pipeline.retrieve(&query, k).await?;

    Ok(Json(RetrieveResponse { k, results }))
}

/// POST /api/v1/evaluate
///
/// Retrieves once at the deepest requested cut-off and reports Precision@K
/// and Recall@K against `relevant_ids` at each cut-off the ranking reaches.
pub async fn handle_evaluate(
    State(state): State<AppState>,
    Json(request): Json<EvaluateRequest>,
) -> Result<Json<EvaluateResponse>, AppError> {
    let k_values = request.k_values.unwrap_or_else(|| DEFAULT_EVAL_K.to_vec());
    let Some(&max_k) = k_values.iter().max() else {
        return Err(AppError::Validation("k_values cannot be empty".to_string()));
    };
    let query = query_context(&state, &request.query_text, request.query_embedding)?;

    let results = state.pipeline.retrieve(&query, max_k).await?;
    let metrics = evaluate(&results, &request.relevant_ids, &k_values);
    let total_relevant = request
        .relevant_ids
        .iter()
        .collect::<HashSet<_>>()
        .len();

    Ok(Json(EvaluateResponse {
        total_relevant,
        retrieved: results.len(),
        metrics,
    }))
}
