//! Reciprocal Rank Fusion of the lexical and vector rankings.
//!
//! ```text
//! fusion(d) = Σ_{r ∈ {lexical, vector}, d ∈ r} 1 / (k + rank_r(d))
//! ```
//!
//! A ranking that does not contain `d` contributes nothing. Candidates found by
//! both rankers therefore tend to outrank candidates found by only one.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::retrieval::types::{FusedResult, RankedHit, SourceRanks};

pub const DEFAULT_RRF_K: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RrfConfig {
    /// Smoothing constant; larger values flatten the gap between ranks.
    pub k: f64,
}

impl Default for RrfConfig {
    fn default() -> Self {
        Self { k: DEFAULT_RRF_K }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FusionRanker {
    config: RrfConfig,
}

impl FusionRanker {
    pub fn new(config: RrfConfig) -> Self {
        Self { config }
    }

    /// Merges both rankings into one list ordered by fusion score descending,
    /// ties by candidate id ascending. Only ids present in an input appear.
    pub fn fuse(&self, lexical: &[RankedHit], vector: &[RankedHit]) -> Vec<FusedResult> {
        let mut fused: HashMap<&str, SourceRanks> =
            HashMap::with_capacity(lexical.len() + vector.len());

        for hit in lexical {
            fused.entry(&hit.candidate_id).or_default().lexical = Some(hit.rank);
        }
        for hit in vector {
            fused.entry(&hit.candidate_id).or_default().vector = Some(hit.rank);
        }

        let mut results: Vec<FusedResult> = fused
            .into_iter()
            .map(|(id, ranks)| FusedResult {
                candidate_id: id.to_string(),
                fusion_score: self.score(ranks),
                source_ranks: ranks,
            })
            .collect();

        results.sort_by(|a, b| {
            b.fusion_score
                .total_cmp(&a.fusion_score)
                .then_with(|| a.candidate_id.cmp(&b.candidate_id))
        });
        results
    }

    /// First `k` fused entries, or fewer when the union is smaller.
    pub fn top_k(&self, lexical: &[RankedHit], vector: &[RankedHit], k: usize) -> Vec<FusedResult> {
        let mut results = self.fuse(lexical, vector);
        results.truncate(k);
        results
    }

    /// Lexical term first, then vector, so the summation order is fixed.
    fn score(&self, ranks: SourceRanks) -> f64 {
        [ranks.lexical, ranks.vector]
            .into_iter()
            .flatten()
            .map(|rank| 1.0 / (self.config.k + rank as f64))
            .sum()
    }
}
