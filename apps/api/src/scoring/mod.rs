//! Scoring Engine — deterministic final fit score from four bounded sub-scores.
//!
//! FinalScore = 0.30·experience + 0.40·skills + 0.10·education + 0.20·projects
//!
//! The weights are compile-time constants, so identical inputs always produce a
//! bitwise-identical score. Out-of-range inputs are rejected, never clamped,
//! and nothing is rounded here; rounding belongs to presentation.
//!
//! How the sub-scores are produced (LLM reasoning, keyword coverage) lives
//! behind `assessor::SubScoreAssessor` and never influences this formula.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod assessor;
pub mod handlers;
pub mod prompts;

pub const EXPERIENCE_WEIGHT: f64 = 0.30;
pub const SKILLS_WEIGHT: f64 = 0.40;
pub const EDUCATION_WEIGHT: f64 = 0.10;
pub const PROJECTS_WEIGHT: f64 = 0.20;

pub const MIN_SUB_SCORE: f64 = 0.0;
pub const MAX_SUB_SCORE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreField {
    ExperienceScore,
    SkillsScore,
    EducationScore,
    ProjectsScore,
}

impl fmt::Display for ScoreField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScoreField::ExperienceScore => "experience_score",
            ScoreField::SkillsScore => "skills_score",
            ScoreField::EducationScore => "education_score",
            ScoreField::ProjectsScore => "projects_score",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ScoreError {
    #[error("{field} must be within [0, 100], got {value}")]
    InvalidScoreRange { field: ScoreField, value: f64 },
}

/// The four sub-scores, each on `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreInputs {
    pub experience_score: f64,
    pub skills_score: f64,
    pub education_score: f64,
    pub projects_score: f64,
}

impl ScoreInputs {
    /// Fields paired with their weights, in formula order.
    pub fn weighted(&self) -> [(ScoreField, f64, f64); 4] {
        [
            (ScoreField::ExperienceScore, self.experience_score, EXPERIENCE_WEIGHT),
            (ScoreField::SkillsScore, self.skills_score, SKILLS_WEIGHT),
            (ScoreField::EducationScore, self.education_score, EDUCATION_WEIGHT),
            (ScoreField::ProjectsScore, self.projects_score, PROJECTS_WEIGHT),
        ]
    }

    /// Fails on the first field outside `[0, 100]` (NaN included).
    pub fn validate(&self) -> Result<(), ScoreError> {
        for (field, value, _) in self.weighted() {
            if !(MIN_SUB_SCORE..=MAX_SUB_SCORE).contains(&value) {
                return Err(ScoreError::InvalidScoreRange { field, value });
            }
        }
        Ok(())
    }
}

/// Final score with the inputs and a human-readable formula line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub final_score: f64,
    pub inputs: ScoreInputs,
    pub breakdown: String,
}

/// Weighted sum of the validated sub-scores.
pub fn compute(inputs: &ScoreInputs) -> Result<f64, ScoreError> {
    inputs.validate()?;
    Ok(EXPERIENCE_WEIGHT * inputs.experience_score
        + SKILLS_WEIGHT * inputs.skills_score
        + EDUCATION_WEIGHT * inputs.education_score
        + PROJECTS_WEIGHT * inputs.projects_score)
}

/// `compute` plus the audit line surfaced next to the reasoning text.
/// The line shows values to at most 3 decimals; `final_score` is unrounded.
pub fn breakdown(inputs: &ScoreInputs) -> Result<ScoreBreakdown, ScoreError> {
    let final_score = compute(inputs)?;
    let breakdown = format!(
        "Final ({}) = Exp ({} * {}) + Skills ({} * {}) + Edu ({} * {}) + Proj ({} * {})",
        display(final_score),
        display(inputs.experience_score),
        EXPERIENCE_WEIGHT,
        display(inputs.skills_score),
        SKILLS_WEIGHT,
        display(inputs.education_score),
        EDUCATION_WEIGHT,
        display(inputs.projects_score),
        PROJECTS_WEIGHT,
    );
    Ok(ScoreBreakdown {
        final_score,
        inputs: *inputs,
        breakdown,
    })
}

fn display(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
