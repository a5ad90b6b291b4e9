mod config;
mod db;
mod embedding;
mod errors;
mod llm_client;
mod matching;
mod models;
mod retrieval;
mod routes;
mod scoring;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::{create_pool, ensure_schema, load_candidates};
use crate::embedding::build_embedder;
use crate::llm_client::LlmClient;
use crate::retrieval::pipeline::RetrievalPipeline;
use crate::routes::build_router;
use crate::scoring::assessor::{KeywordSubScoreAssessor, LlmSubScoreAssessor, SubScoreAssessor};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed numeric env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Screener API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize embedder
    let embedder = build_embedder(&config.embedding())?;
    info!(
        "Embedder initialized (backend: {}, dims: {})",
        embedder.backend(),
        embedder.dims()
    );

    // Initialize retrieval pipeline (BM25 + exact cosine, fused with RRF)
    let pipeline = Arc::new(RetrievalPipeline::new(config.retrieval()));
    info!(
        "Retrieval config: k1={}, b={}, rrf_k={}, default k={}",
        config.bm25_k1,
        config.bm25_b,
        config.rrf_k,
        config.default_k()
    );

    // Initialize PostgreSQL (optional) and restore the persisted corpus
    let db = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            ensure_schema(&pool)
                .await
                .context("Failed to create candidates table")?;
            let records = load_candidates(&pool)
                .await
                .context("Failed to load persisted candidates")?;
            let stats = pipeline
                .index(records)
                .await
                .context("Persisted corpus failed validation")?;
            info!("Restored {} candidates from PostgreSQL", stats.candidate_count);
            Some(pool)
        }
        None => {
            info!("DATABASE_URL not set; corpus is in-memory only");
            None
        }
    };

    // Initialize sub-score assessor (keyword by default, LLM when a key is present)
    let assessor: Arc<dyn SubScoreAssessor> = match &config.anthropic_api_key {
        Some(key) => {
            let llm = LlmClient::new(key.clone(), config.reasoning_model.clone())
                .context("Failed to build LLM HTTP client")?;
            info!("LLM assessor initialized (model: {})", llm.model());
            Arc::new(LlmSubScoreAssessor(llm))
        }
        None => {
            info!("ANTHROPIC_API_KEY not set; using keyword assessor");
            Arc::new(KeywordSubScoreAssessor)
        }
    };

    // Build app state
    let state = AppState {
        db,
        config: config.clone(),
        pipeline,
        embedder: Arc::from(embedder),
        assessor,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the UI host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
