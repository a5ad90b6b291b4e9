//! Matcher — retrieve a shortlist, assess each candidate, score and re-rank.
//!
//! Retrieval decides who is considered; the final order comes from the
//! deterministic score over assessed sub-scores. A candidate whose assessment
//! or scoring fails is reported in `failures`, never silently dropped and
//! never clamped into range.

pub mod handlers;

use std::cmp::Ordering;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::retrieval::pipeline::RetrievalPipeline;
use crate::retrieval::store::CorpusSnapshot;
use crate::retrieval::types::{FusedResult, QueryContext, SourceRanks};
use crate::scoring::assessor::{Assessment, SubScoreAssessor};
use crate::scoring::{breakdown, ScoreBreakdown};

// ────────────────────────────────────────────────────────────────────────────
// Report types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub candidate_id: String,
    pub fusion_score: f64,
    pub source_ranks: SourceRanks,
    pub score: ScoreBreakdown,
    pub assessment: Assessment,
    pub assessor: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchFailure {
    pub candidate_id: String,
    pub error: String,
}

/// Averages over the successfully scored candidates, rounded to 3 decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchSummary {
    pub total_candidates: usize,
    pub average_final_score: f64,
    pub average_experience_score: f64,
    pub average_skills_score: f64,
    pub average_education_score: f64,
    pub average_projects_score: f64,
    pub top_candidate: Option<String>,
    pub top_candidate_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchReport {
    pub run_id: Uuid,
    pub results: Vec<MatchResult>,
    pub failures: Vec<MatchFailure>,
    pub summary: MatchSummary,
}

// ────────────────────────────────────────────────────────────────────────────
// Matching
// ────────────────────────────────────────────────────────────────────────────

/// Retrieves the fused top-`k` for `query` and scores each hit.
///
/// Only retrieval errors (e.g. a query of the wrong dimension) fail the whole
/// run; per-candidate errors land in `failures`. Retrieval and record lookups
/// read one snapshot, so a rebuild mid-run does not affect this run.
pub async fn match_candidates(
    pipeline: &RetrievalPipeline,
    assessor: &dyn SubScoreAssessor,
    query: &QueryContext,
    k: usize,
) -> Result<MatchReport, AppError> {
    let run_id = Uuid::new_v4();
    let started = Instant::now();

    let snapshot = pipeline.store().snapshot();
    let shortlist = pipeline.retrieve_in(&snapshot, query, k).await?;

    let mut results = Vec::with_capacity(shortlist.len());
    let mut failures = Vec::new();

    for hit in shortlist {
        let candidate_id = hit.candidate_id.clone();
        match assess_one(&snapshot, assessor, &query.text, hit).await {
            Ok(result) => results.push(result),
            Err(e) => {
                warn!("Match run {run_id}: candidate '{candidate_id}' failed: {e}");
                failures.push(MatchFailure {
                    candidate_id,
                    error: e.to_string(),
                });
            }
        }
    }

    sort_results(&mut results);
    let summary = summarize(&results);

    info!(
        "Match run {run_id}: {} scored, {} failed, assessor {} in {:?}",
        results.len(),
        failures.len(),
        assessor.backend(),
        started.elapsed()
    );

    Ok(MatchReport {
        run_id,
        results,
        failures,
        summary,
    })
}

async fn assess_one(
    snapshot: &CorpusSnapshot,
    assessor: &dyn SubScoreAssessor,
    jd_text: &str,
    hit: FusedResult,
) -> Result<MatchResult, AppError> {
    let record = snapshot.get(&hit.candidate_id)?;
    let assessment = assessor.assess(jd_text, &record).await?;
    let score = breakdown(&assessment.inputs)?;
    Ok(MatchResult {
        candidate_id: hit.candidate_id,
        fusion_score: hit.fusion_score,
        source_ranks: hit.source_ranks,
        score,
        assessment,
        assessor: assessor.backend(),
    })
}

/// Final score descending, then candidate id ascending.
fn sort_results(results: &mut [MatchResult]) {
    results.sort_by(|a, b| {
        match b.score.final_score.total_cmp(&a.score.final_score) {
            Ordering::Equal => a.candidate_id.cmp(&b.candidate_id),
            other => other,
        }
    });
}

fn summarize(results: &[MatchResult]) -> MatchSummary {
    let total = results.len();
    let average = |pick: fn(&MatchResult) -> f64| -> f64 {
        if total == 0 {
            return 0.0;
        }
        let mean = results.iter().map(pick).sum::<f64>() / total as f64;
        (mean * 1000.0).round() / 1000.0
    };

    MatchSummary {
        total_candidates: total,
        average_final_score: average(|r| r.score.final_score),
        average_experience_score: average(|r| r.score.inputs.experience_score),
        average_skills_score: average(|r| r.score.inputs.skills_score),
        average_education_score: average(|r| r.score.inputs.education_score),
        average_projects_score: average(|r| r.score.inputs.projects_score),
        top_candidate: results.first().map(|r| r.candidate_id.clone()),
        top_candidate_score: results.first().map(|r| r.score.final_score),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::retrieval::pipeline::RetrievalConfig;
    use crate::retrieval::types::CandidateRecord;
    use crate::scoring::ScoreInputs;

    /// Returns fixed sub-scores per candidate id; unknown ids get an
    /// out-of-range skills score.
    struct FixedAssessor;

    #[async_trait]
    impl SubScoreAssessor for FixedAssessor {
        async fn assess(
            &self,
            _jd_text: &str,
            candidate: &CandidateRecord,
        ) -> Result<Assessment, AppError> {
            let (e, s, ed, p) = match candidate.id.as_str() {
                "alice" => (90.0, 95.0, 80.0, 85.0),
                "bob" => (50.0, 60.0, 70.0, 40.0),
                "carol" => (90.0, 95.0, 80.0, 85.0),
                "dave" => return Err(AppError::Llm("model unavailable".to_string())),
                _ => (50.0, 140.0, 50.0, 50.0),
            };
            Ok(Assessment {
                inputs: ScoreInputs {
                    experience_score: e,
                    skills_score: s,
                    education_score: ed,
                    projects_score: p,
                },
                strengths: vec![],
                gaps: vec![],
                reasoning: String::new(),
            })
        }

        fn backend(&self) -> &'static str {
            "fixed"
        }
    }

    async fn pipeline(ids: &[&str]) -> RetrievalPipeline {
        let pipeline = RetrievalPipeline::new(RetrievalConfig::default());
        let records = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let mut embedding = vec![0.1; 4];
                embedding[i % 4] = 1.0;
                CandidateRecord::new(*id, format!("rust engineer {id}"), embedding)
            })
            .collect();
        pipeline.index(records).await.unwrap();
        pipeline
    }

    fn query() -> QueryContext {
        QueryContext::new("rust engineer", vec![1.0, 0.0, 0.0, 0.0])
    }

    #[tokio::test]
    async fn test_results_sorted_by_final_score_then_id() {
        let pipeline = pipeline(&["carol", "bob", "alice"]).await;
        let report = match_candidates(&pipeline, &FixedAssessor, &query(), 10)
            .await
            .unwrap();

        let ids: Vec<&str> = report.results.iter().map(|r| r.candidate_id.as_str()).collect();
        assert_eq!(ids, vec!["alice", "carol", "bob"]);
        assert!((report.results[0].score.final_score - 90.0).abs() < 1e-9);
        assert!(report.failures.is_empty());
        assert_eq!(report.results[0].assessor, "fixed");
    }

    #[tokio::test]
    async fn test_failures_are_reported_not_dropped() {
        let pipeline = pipeline(&["alice", "dave", "eve"]).await;
        let report = match_candidates(&pipeline, &FixedAssessor, &query(), 10)
            .await
            .unwrap();

        assert_eq!(report.results.len(), 1);
        let mut failed: Vec<&str> = report.failures.iter().map(|f| f.candidate_id.as_str()).collect();
        failed.sort();
        assert_eq!(failed, vec!["dave", "eve"]);
        let eve = report.failures.iter().find(|f| f.candidate_id == "eve").unwrap();
        assert!(eve.error.contains("skills_score"));
    }

    #[tokio::test]
    async fn test_k_limits_the_shortlist() {
        let pipeline = pipeline(&["alice", "bob", "carol"]).await;
        let report = match_candidates(&pipeline, &FixedAssessor, &query(), 2)
            .await
            .unwrap();
        assert_eq!(report.results.len() + report.failures.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_corpus_yields_empty_report() {
        let pipeline = RetrievalPipeline::new(RetrievalConfig::default());
        let report = match_candidates(&pipeline, &FixedAssessor, &query(), 10)
            .await
            .unwrap();
        assert!(report.results.is_empty());
        assert_eq!(report.summary.total_candidates, 0);
        assert_eq!(report.summary.top_candidate, None);
        assert_eq!(report.summary.average_final_score, 0.0);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_fails_the_run() {
        let pipeline = pipeline(&["alice"]).await;
        let bad = QueryContext::new("rust", vec![1.0, 0.0]);
        let err = match_candidates(&pipeline, &FixedAssessor, &bad, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Corpus(_)));
    }

    #[tokio::test]
    async fn test_summary_averages() {
        let pipeline = pipeline(&["alice", "bob"]).await;
        let report = match_candidates(&pipeline, &FixedAssessor, &query(), 10)
            .await
            .unwrap();
        let summary = &report.summary;
        assert_eq!(summary.total_candidates, 2);
        assert_eq!(summary.top_candidate.as_deref(), Some("alice"));
        assert_eq!(summary.average_experience_score, 70.0);
        assert_eq!(summary.average_skills_score, 77.5);
    }

    /// Replaces the corpus on its first call, then scores like `FixedAssessor`.
    struct RebuildingAssessor {
        pipeline: Arc<RetrievalPipeline>,
        rebuilt: AtomicBool,
    }

    #[async_trait]
    impl SubScoreAssessor for RebuildingAssessor {
        async fn assess(
            &self,
            jd_text: &str,
            candidate: &CandidateRecord,
        ) -> Result<Assessment, AppError> {
            if !self.rebuilt.swap(true, AtomicOrdering::SeqCst) {
                let zed = CandidateRecord::new("zed", "go developer", vec![0.0, 1.0, 0.0, 0.0]);
                self.pipeline.index(vec![zed]).await?;
            }
            FixedAssessor.assess(jd_text, candidate).await
        }

        fn backend(&self) -> &'static str {
            "rebuilding"
        }
    }

    #[tokio::test]
    async fn test_rebuild_during_run_keeps_retrieved_candidates() {
        let pipeline = Arc::new(pipeline(&["alice", "bob"]).await);
        let assessor = RebuildingAssessor {
            pipeline: Arc::clone(&pipeline),
            rebuilt: AtomicBool::new(false),
        };

        let report = match_candidates(&pipeline, &assessor, &query(), 10)
            .await
            .unwrap();

        assert!(report.failures.is_empty());
        let ids: Vec<&str> = report.results.iter().map(|r| r.candidate_id.as_str()).collect();
        assert_eq!(ids, vec!["alice", "bob"]);
        assert!(pipeline.get("alice").is_err());
        assert!(pipeline.get("zed").is_ok());
    }
}
