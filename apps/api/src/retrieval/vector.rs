//! Embedding similarity index.
//!
//! `VectorIndex` is the seam for swapping nearest-neighbour strategies. Fusion
//! only relies on the contract: every candidate ranked, similarity descending,
//! ties by candidate id ascending.

use std::fmt::Debug;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::retrieval::error::CorpusError;
use crate::retrieval::types::{rank_scored, CandidateRecord, RankedHit};

pub trait VectorIndex: Send + Sync + Debug {
    fn dimension(&self) -> usize;

    fn len(&self) -> usize;

    /// Ranks every indexed candidate by cosine similarity to `query`.
    fn search(&self, query: &[f32]) -> Result<Vec<RankedHit>, CorpusError>;
}

/// Which `VectorIndex` implementation a snapshot is built with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorBackend {
    /// Brute-force scan. Exact; fine for resume-sized corpora.
    #[default]
    Exact,
}

impl VectorBackend {
    pub fn build(
        self,
        records: &[impl AsRef<CandidateRecord>],
        dimension: usize,
    ) -> Result<Arc<dyn VectorIndex>, CorpusError> {
        match self {
            VectorBackend::Exact => Ok(Arc::new(ExactVectorIndex::build(records, dimension)?)),
        }
    }
}

/// Flat index of unit-length embeddings; a query is one dot product per candidate.
#[derive(Debug, Default)]
pub struct ExactVectorIndex {
    dimension: usize,
    doc_ids: Vec<String>,
    /// Row-major, `doc_ids.len() × dimension`, each row L2-normalized.
    vectors: Vec<f32>,
}

impl ExactVectorIndex {
    pub fn build(
        records: &[impl AsRef<CandidateRecord>],
        dimension: usize,
    ) -> Result<Self, CorpusError> {
        let mut doc_ids = Vec::with_capacity(records.len());
        let mut vectors = Vec::with_capacity(records.len() * dimension);

        for record in records {
            let record = record.as_ref();
            validate_dimension(dimension, record.dimension())?;
            vectors.extend(normalized(&record.embedding));
            doc_ids.push(record.id.clone());
        }

        Ok(Self {
            dimension,
            doc_ids,
            vectors,
        })
    }
}

impl VectorIndex for ExactVectorIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.doc_ids.len()
    }

    fn search(&self, query: &[f32]) -> Result<Vec<RankedHit>, CorpusError> {
        validate_dimension(self.dimension, query.len())?;
        let query = normalized(query);

        let scored = if self.dimension == 0 {
            self.doc_ids.iter().map(|id| (id.clone(), 0.0)).collect()
        } else {
            self.doc_ids
                .iter()
                .zip(self.vectors.chunks_exact(self.dimension))
                .map(|(id, row)| (id.clone(), dot(row, &query)))
                .collect()
        };

        Ok(rank_scored(scored))
    }
}

pub fn validate_dimension(expected: usize, actual: usize) -> Result<(), CorpusError> {
    if expected != actual {
        return Err(CorpusError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

/// Cosine similarity in f64. Zero vectors have similarity 0 with everything.
#[cfg(test)]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot(a, b) / (norm_a * norm_b)
}

fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum()
}

fn l2_norm(v: &[f32]) -> f64 {
    v.iter().map(|&x| f64::from(x) * f64::from(x)).sum::<f64>().sqrt()
}

fn normalized(v: &[f32]) -> Vec<f32> {
    let norm = l2_norm(v);
    if norm == 0.0 {
        return vec![0.0; v.len()];
    }
    v.iter().map(|&x| (f64::from(x) / norm) as f32).collect()
}
