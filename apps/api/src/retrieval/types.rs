//! Data types shared by the candidate store, both indexes and the fusion ranker.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::retrieval::error::CorpusError;

/// A normalized candidate as delivered by the extraction stage.
/// Immutable once indexed; replaced only by a corpus rebuild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: String,
    pub normalized_text: String,
    pub embedding: Vec<f32>,
    /// category → free-form value (skills, experience, education, projects, ...)
    #[serde(default)]
    pub structured_fields: BTreeMap<String, Value>,
}

impl CandidateRecord {
    #[cfg(test)]
    pub fn new(id: impl Into<String>, normalized_text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            normalized_text: normalized_text.into(),
            embedding,
            structured_fields: BTreeMap::new(),
        }
    }

    #[cfg(test)]
    pub fn with_field(mut self, category: &str, value: impl Into<Value>) -> Self {
        self.structured_fields.insert(category.to_string(), value.into());
        self
    }

    /// Checks the per-record invariants. Dimension agreement is a corpus-level
    /// check and happens in the store.
    pub fn validate(&self) -> Result<(), CorpusError> {
        if self.id.trim().is_empty() {
            return Err(CorpusError::EmptyId);
        }
        if self.normalized_text.trim().is_empty() {
            return Err(CorpusError::EmptyText(self.id.clone()));
        }
        if self.embedding.iter().any(|v| !v.is_finite()) {
            return Err(CorpusError::NonFiniteEmbedding(self.id.clone()));
        }
        Ok(())
    }

    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }
}

impl AsRef<CandidateRecord> for CandidateRecord {
    fn as_ref(&self) -> &CandidateRecord {
        self
    }
}

/// The job description side of a retrieval call.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryContext {
    pub text: String,
    pub embedding: Vec<f32>,
}

impl QueryContext {
    pub fn new(text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            text: text.into(),
            embedding,
        }
    }
}

/// One position in a single ranker's output. `raw_score` is only comparable
/// within the ranking that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedHit {
    pub candidate_id: String,
    pub rank: usize,
    pub raw_score: f64,
}

/// Rank of a candidate in each contributing ranking; `None` when absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceRanks {
    pub lexical: Option<usize>,
    pub vector: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusedResult {
    pub candidate_id: String,
    pub fusion_score: f64,
    pub source_ranks: SourceRanks,
}

/// Orders (id, score) pairs by score descending, then id ascending, and
/// assigns 1-based ranks.
pub(crate) fn rank_scored(mut scored: Vec<(String, f64)>) -> Vec<RankedHit> {
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    scored
        .into_iter()
        .enumerate()
        .map(|(i, (candidate_id, raw_score))| RankedHit {
            candidate_id,
            rank: i + 1,
            raw_score,
        })
        .collect()
}
