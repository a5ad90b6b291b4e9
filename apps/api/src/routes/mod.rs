pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::matching::handlers as matching;
use crate::retrieval::handlers as retrieval;
use crate::scoring::handlers as scoring;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Corpus API
        .route(
            "/api/v1/corpus",
            get(retrieval::handle_corpus_stats).post(retrieval::handle_index),
        )
        .route(
            "/api/v1/corpus/candidates",
            post(retrieval::handle_add_candidate),
        )
        .route(
            "/api/v1/candidates/:id",
            get(retrieval::handle_get_candidate),
        )
        // Retrieval, scoring and matching
        .route("/api/v1/retrieve", post(retrieval::handle_retrieve))
        .route("/api/v1/evaluate", post(retrieval::handle_evaluate))
        .route("/api/v1/score", post(scoring::handle_score))
        .route("/api/v1/match", post(matching::handle_match))
        .with_state(state)
}
