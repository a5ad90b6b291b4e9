use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::embedding::Embedder;
use crate::retrieval::pipeline::RetrievalPipeline;
use crate::scoring::assessor::SubScoreAssessor;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// `None` runs the corpus in memory only.
    pub db: Option<PgPool>,
    pub config: Config,
    pub pipeline: Arc<RetrievalPipeline>,
    /// Fills in embeddings for candidates and queries that arrive without one.
    pub embedder: Arc<dyn Embedder>,
    /// Pluggable sub-score assessor. Default: KeywordSubScoreAssessor. LLM when an API key is set.
    pub assessor: Arc<dyn SubScoreAssessor>,
}

impl AppState {
    /// In-memory state with the keyword assessor and hash embeddings.
    #[cfg(test)]
    pub fn in_memory(config: Config) -> anyhow::Result<Self> {
        let embedder = crate::embedding::build_embedder(&config.embedding())?;
        Ok(AppState {
            db: None,
            pipeline: Arc::new(RetrievalPipeline::new(config.retrieval())),
            embedder: Arc::from(embedder),
            assessor: Arc::new(crate::scoring::assessor::KeywordSubScoreAssessor),
            config,
        })
    }
}
