use std::str::FromStr;

use anyhow::{Context, Result};

use crate::embedding::EmbeddingConfig;
use crate::llm_client::DEFAULT_MODEL;
use crate::retrieval::fusion::RrfConfig;
use crate::retrieval::lexical::Bm25Params;
use crate::retrieval::pipeline::RetrievalConfig;
use crate::retrieval::vector::VectorBackend;

/// Application configuration loaded from environment variables.
/// Everything is optional: no `DATABASE_URL` means an in-memory corpus, no
/// `ANTHROPIC_API_KEY` means the keyword assessor.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub reasoning_model: String,
    pub embedding_backend: String,
    pub embedding_dims: usize,
    pub bm25_k1: f64,
    pub bm25_b: f64,
    pub rrf_k: f64,
    pub top_n_candidates: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Default for Config {
    fn default() -> Self {
        let bm25 = Bm25Params::default();
        let embedding = EmbeddingConfig::default();
        Config {
            database_url: None,
            anthropic_api_key: None,
            reasoning_model: DEFAULT_MODEL.to_string(),
            embedding_backend: embedding.backend,
            embedding_dims: embedding.dims,
            bm25_k1: bm25.k1,
            bm25_b: bm25.b,
            rrf_k: RrfConfig::default().k,
            top_n_candidates: 5,
            port: 8080,
            rust_log: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = Config::default();
        let config = Config {
            database_url: optional_env("DATABASE_URL"),
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            reasoning_model: optional_env("REASONING_MODEL").unwrap_or(defaults.reasoning_model),
            embedding_backend: optional_env("EMBEDDING_BACKEND")
                .unwrap_or(defaults.embedding_backend),
            embedding_dims: parse_env("EMBEDDING_DIMS", defaults.embedding_dims)?,
            bm25_k1: parse_env("BM25_K1", defaults.bm25_k1)?,
            bm25_b: parse_env("BM25_B", defaults.bm25_b)?,
            rrf_k: parse_env("RRF_K", defaults.rrf_k)?,
            top_n_candidates: parse_env("TOP_N_CANDIDATES", defaults.top_n_candidates)?,
            port: parse_env("PORT", defaults.port)?,
            rust_log: optional_env("RUST_LOG").unwrap_or(defaults.rust_log),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.bm25_k1.is_finite() && self.bm25_k1 >= 0.0,
            "BM25_K1 must be a non-negative number"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.bm25_b),
            "BM25_B must be within [0, 1]"
        );
        anyhow::ensure!(
            self.rrf_k.is_finite() && self.rrf_k > 0.0,
            "RRF_K must be a positive number"
        );
        anyhow::ensure!(self.top_n_candidates > 0, "TOP_N_CANDIDATES must be at least 1");
        Ok(())
    }

    pub fn retrieval(&self) -> RetrievalConfig {
        RetrievalConfig {
            bm25: Bm25Params {
                k1: self.bm25_k1,
                b: self.bm25_b,
            },
            rrf: RrfConfig { k: self.rrf_k },
            vector_backend: VectorBackend::Exact,
        }
    }

    pub fn embedding(&self) -> EmbeddingConfig {
        EmbeddingConfig {
            backend: self.embedding_backend.clone(),
            dims: self.embedding_dims,
        }
    }

    /// Retrieval depth when a request omits `k`: twice the shortlist size, so
    /// the matcher has room to re-rank.
    pub fn default_k(&self) -> usize {
        self.top_n_candidates * 2
    }
}

/// Unset and blank values both read as absent.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.default_k(), 10);
        assert_eq!(config.embedding_dims, 768);
        assert_eq!(config.embedding_backend, "hash");
        assert_eq!(config.rrf_k, 60.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_retrieval_config_carries_parameters() {
        let config = Config {
            bm25_k1: 1.2,
            bm25_b: 0.5,
            rrf_k: 10.0,
            ..Config::default()
        };
        let retrieval = config.retrieval();
        assert_eq!(retrieval.bm25.k1, 1.2);
        assert_eq!(retrieval.bm25.b, 0.5);
        assert_eq!(retrieval.rrf.k, 10.0);
    }

    #[test]
    fn test_validate_rejects_bad_parameters() {
        assert!(Config { bm25_b: 1.5, ..Config::default() }.validate().is_err());
        assert!(Config { rrf_k: 0.0, ..Config::default() }.validate().is_err());
        assert!(Config { top_n_candidates: 0, ..Config::default() }.validate().is_err());
    }
}
