//! Offline retrieval quality: Precision@K and Recall@K of a fused ranking
//! against a set of ids judged relevant for the query.

use std::collections::HashSet;

use serde::Serialize;

use crate::retrieval::types::FusedResult;

/// Cut-offs reported when the caller does not choose its own.
pub const DEFAULT_EVAL_K: [usize; 4] = [3, 5, 10, 15];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalMetrics {
    pub k: usize,
    pub retrieved_relevant: usize,
    /// Relevant hits in the top `k`, over `k`.
    pub precision: f64,
    /// Relevant hits in the top `k`, over all relevant ids.
    pub recall: f64,
}

/// Metrics for the top `k` of `results`.
///
/// `k = 0` gives zero precision. An empty relevant set gives zero recall.
/// A list shorter than `k` still divides precision by `k`.
pub fn metrics_at_k(results: &[FusedResult], relevant: &HashSet<&str>, k: usize) -> RetrievalMetrics {
    let retrieved_relevant = results
        .iter()
        .take(k)
        .filter(|r| relevant.contains(r.candidate_id.as_str()))
        .count();

    let precision = if k == 0 {
        0.0
    } else {
        retrieved_relevant as f64 / k as f64
    };
    let recall = if relevant.is_empty() {
        0.0
    } else {
        retrieved_relevant as f64 / relevant.len() as f64
    };

    RetrievalMetrics {
        k,
        retrieved_relevant,
        precision: round3(precision),
        recall: round3(recall),
    }
}

/// Metrics at each of `k_values`, skipping any cut-off deeper than the
/// ranking itself. Duplicate relevant ids count once.
pub fn evaluate(results: &[FusedResult], relevant_ids: &[String], k_values: &[usize]) -> Vec<RetrievalMetrics> {
    let relevant: HashSet<&str> = relevant_ids.iter().map(String::as_str).collect();
    k_values
        .iter()
        .filter(|&&k| k <= results.len())
        .map(|&k| metrics_at_k(results, &relevant, k))
        .collect()
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::types::SourceRanks;

    fn ranking(ids: &[&str]) -> Vec<FusedResult> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| FusedResult {
                candidate_id: id.to_string(),
                fusion_score: 1.0 / (61 + i) as f64,
                source_ranks: SourceRanks::default(),
            })
            .collect()
    }

    fn relevant<'a>(ids: &[&'a str]) -> HashSet<&'a str> {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_precision_and_recall_at_k() {
        let results = ranking(&["a", "x", "b", "y", "c"]);
        let m = metrics_at_k(&results, &relevant(&["a", "b", "c", "d"]), 3);
        assert_eq!(m.retrieved_relevant, 2);
        assert_eq!(m.precision, 0.667);
        assert_eq!(m.recall, 0.5);
    }

    #[test]
    fn test_k_zero_has_zero_precision() {
        let results = ranking(&["a", "b"]);
        let m = metrics_at_k(&results, &relevant(&["a"]), 0);
        assert_eq!(m.retrieved_relevant, 0);
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.recall, 0.0);
    }

    #[test]
    fn test_empty_relevant_set_has_zero_recall() {
        let results = ranking(&["a", "b", "c"]);
        let m = metrics_at_k(&results, &HashSet::new(), 3);
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.recall, 0.0);
    }

    #[test]
    fn test_k_beyond_results_divides_by_k() {
        let results = ranking(&["a", "b"]);
        let m = metrics_at_k(&results, &relevant(&["a", "b"]), 5);
        assert_eq!(m.retrieved_relevant, 2);
        assert_eq!(m.precision, 0.4);
        assert_eq!(m.recall, 1.0);
    }

    #[test]
    fn test_evaluate_skips_cutoffs_deeper_than_ranking() {
        let results = ranking(&["a", "x", "b", "y"]);
        let relevant_ids = vec!["a".to_string(), "b".to_string(), "a".to_string()];
        let metrics = evaluate(&results, &relevant_ids, &DEFAULT_EVAL_K);
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].k, 3);
        assert_eq!(metrics[0].recall, 0.5);
    }

    #[test]
    fn test_evaluate_empty_ranking_reports_nothing_past_zero() {
        let metrics = evaluate(&[], &["a".to_string()], &[0, 3]);
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].k, 0);
    }
}
