//! Retrieval pipeline — one query against one captured corpus snapshot.
//!
//! The lexical and vector searches share no data besides the immutable
//! snapshot, so both run on blocking threads at once and are joined before
//! fusion.

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::retrieval::error::CorpusError;
use crate::retrieval::fusion::{FusionRanker, RrfConfig};
use crate::retrieval::lexical::Bm25Params;
use crate::retrieval::store::{CandidateStore, CorpusSnapshot, CorpusStats, IndexSettings};
use crate::retrieval::types::{CandidateRecord, FusedResult, QueryContext};
use crate::retrieval::vector::{validate_dimension, VectorBackend, VectorIndex};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RetrievalConfig {
    pub bm25: Bm25Params,
    pub rrf: RrfConfig,
    pub vector_backend: VectorBackend,
}

pub struct RetrievalPipeline {
    store: CandidateStore,
    ranker: FusionRanker,
}

impl RetrievalPipeline {
    pub fn new(config: RetrievalConfig) -> Self {
        Self {
            store: CandidateStore::new(IndexSettings {
                bm25: config.bm25,
                vector_backend: config.vector_backend,
            }),
            ranker: FusionRanker::new(config.rrf),
        }
    }

    pub fn store(&self) -> &CandidateStore {
        &self.store
    }

    /// Builds and publishes a new corpus, replacing the current one.
    pub async fn index(&self, records: Vec<CandidateRecord>) -> Result<CorpusStats, CorpusError> {
        self.store.rebuild(records).await
    }

    pub async fn add(&self, record: CandidateRecord) -> Result<CorpusStats, CorpusError> {
        self.store.add(record).await
    }

    pub fn get(&self, id: &str) -> Result<Arc<CandidateRecord>, CorpusError> {
        self.store.get(id)
    }

    /// Fused top-`k` candidates for `query`.
    ///
    /// An empty corpus yields an empty list. Fewer than `k` results come back
    /// when the union of both rankings is smaller than `k`.
    pub async fn retrieve(
        &self,
        query: &QueryContext,
        k: usize,
    ) -> Result<Vec<FusedResult>, CorpusError> {
        self.retrieve_in(&self.store.snapshot(), query, k).await
    }

    /// `retrieve` against a snapshot the caller already holds. Callers that
    /// look records up after retrieval use the same snapshot for both.
    pub async fn retrieve_in(
        &self,
        snapshot: &Arc<CorpusSnapshot>,
        query: &QueryContext,
        k: usize,
    ) -> Result<Vec<FusedResult>, CorpusError> {
        if snapshot.is_empty() || k == 0 {
            debug!("Retrieval skipped: corpus size {}, k {}", snapshot.len(), k);
            return Ok(Vec::new());
        }
        validate_dimension(snapshot.vector().dimension(), query.embedding.len())?;
        if query.embedding.iter().any(|v| !v.is_finite()) {
            return Err(CorpusError::NonFiniteEmbedding("query".to_string()));
        }

        let started = Instant::now();

        let lexical_task = {
            let snapshot = Arc::clone(snapshot);
            let text = query.text.clone();
            tokio::task::spawn_blocking(move || snapshot.lexical().search(&text))
        };
        let vector_task = {
            let snapshot = Arc::clone(snapshot);
            let embedding = query.embedding.clone();
            tokio::task::spawn_blocking(move || snapshot.vector().search(&embedding))
        };

        let (lexical, vector) = tokio::try_join!(lexical_task, vector_task)?;
        let vector = vector?;

        let fused = self.ranker.top_k(&lexical, &vector, k);

        debug!(
            "Retrieved {} of {} candidates (lexical hits {}, vector hits {}/{}, generation {}) in {:?}",
            fused.len(),
            snapshot.len(),
            lexical.len(),
            vector.len(),
            snapshot.vector().len(),
            snapshot.generation(),
            started.elapsed()
        );

        Ok(fused)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline() -> RetrievalPipeline {
        RetrievalPipeline::new(RetrievalConfig::default())
    }

    fn corpus() -> Vec<CandidateRecord> {
        vec![
            CandidateRecord::new(
                "alice",
                "Backend engineer: Python, FastAPI, PostgreSQL, Redis, AWS, Docker",
                vec![0.9, 0.1, 0.0],
            ),
            CandidateRecord::new(
                "bob",
                "BI analyst with SQL, Tableau and basic Python",
                vec![0.2, 0.9, 0.1],
            ),
            CandidateRecord::new(
                "carol",
                "Watercolor illustrator and gallery curator",
                vec![0.95, 0.05, 0.0],
            ),
        ]
    }

    fn ids(results: &[FusedResult]) -> Vec<&str> {
        results.iter().map(|r| r.candidate_id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_empty_corpus_returns_empty() {
        let pipeline = pipeline();
        let query = QueryContext::new("python engineer", vec![1.0, 0.0, 0.0]);
        assert!(pipeline.retrieve(&query, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rebuild_to_zero_then_retrieve_is_empty() {
        let pipeline = pipeline();
        pipeline.index(corpus()).await.unwrap();
        pipeline.index(vec![]).await.unwrap();
        let query = QueryContext::new("python", vec![1.0, 0.0, 0.0]);
        assert!(pipeline.retrieve(&query, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_fuses_both_rankings() {
        let pipeline = pipeline();
        pipeline.index(corpus()).await.unwrap();

        let query = QueryContext::new("Python FastAPI engineer", vec![1.0, 0.0, 0.0]);
        let results = pipeline.retrieve(&query, 10).await.unwrap();

        // Vector ranking covers every candidate, so the union is the corpus.
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].candidate_id, "alice");
        assert!(results[0].source_ranks.lexical.is_some());
        assert!(results[0].source_ranks.vector.is_some());

        // carol shares no terms with the query: vector-only despite high similarity.
        let carol = results.iter().find(|r| r.candidate_id == "carol").unwrap();
        assert_eq!(carol.source_ranks.lexical, None);
        assert_eq!(carol.source_ranks.vector, Some(1));
    }

    #[tokio::test]
    async fn test_retrieve_truncates_to_k() {
        let pipeline = pipeline();
        pipeline.index(corpus()).await.unwrap();
        let query = QueryContext::new("python", vec![1.0, 0.0, 0.0]);
        assert_eq!(pipeline.retrieve(&query, 2).await.unwrap().len(), 2);
        assert!(pipeline.retrieve(&query, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_dimension_mismatch() {
        let pipeline = pipeline();
        pipeline.index(corpus()).await.unwrap();
        let query = QueryContext::new("python", vec![1.0, 0.0]);
        assert_eq!(
            pipeline.retrieve(&query, 5).await.unwrap_err(),
            CorpusError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        );
    }

    #[tokio::test]
    async fn test_retrieve_is_deterministic() {
        let pipeline = pipeline();
        pipeline.index(corpus()).await.unwrap();
        let query = QueryContext::new("python sql engineer", vec![0.5, 0.5, 0.0]);
        let first = pipeline.retrieve(&query, 3).await.unwrap();
        for _ in 0..5 {
            assert_eq!(pipeline.retrieve(&query, 3).await.unwrap(), first);
        }
    }

    #[tokio::test]
    async fn test_added_candidate_is_retrievable() {
        let pipeline = pipeline();
        pipeline.index(corpus()).await.unwrap();
        pipeline
            .add(CandidateRecord::new("dave", "Kafka streaming engineer", vec![0.0, 0.0, 1.0]))
            .await
            .unwrap();

        let query = QueryContext::new("kafka", vec![0.0, 0.0, 1.0]);
        let results = pipeline.retrieve(&query, 1).await.unwrap();
        assert_eq!(ids(&results), vec!["dave"]);
        assert_eq!(pipeline.get("dave").unwrap().normalized_text, "Kafka streaming engineer");
    }

    #[tokio::test]
    async fn test_tokenless_candidate_is_vector_only() {
        let pipeline = pipeline();
        pipeline
            .index(vec![
                CandidateRecord::new("sym", "--- *** ---", vec![1.0, 0.0, 0.0]),
                CandidateRecord::new("txt", "rust engineer", vec![0.0, 1.0, 0.0]),
            ])
            .await
            .unwrap();
        let query = QueryContext::new("rust", vec![1.0, 0.0, 0.0]);
        let results = pipeline.retrieve(&query, 5).await.unwrap();
        let sym = results.iter().find(|r| r.candidate_id == "sym").unwrap();
        assert_eq!(sym.source_ranks.lexical, None);
        assert_eq!(sym.source_ranks.vector, Some(1));
    }

    #[tokio::test]
    async fn test_concurrent_queries_agree() {
        let pipeline = Arc::new(pipeline());
        pipeline.index(corpus()).await.unwrap();
        let query = QueryContext::new("python engineer", vec![0.7, 0.3, 0.0]);
        let expected = pipeline.retrieve(&query, 3).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let pipeline = Arc::clone(&pipeline);
            let query = query.clone();
            handles.push(tokio::spawn(async move { pipeline.retrieve(&query, 3).await }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), expected);
        }
    }
}
