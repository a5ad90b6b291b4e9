use crate::llm_client::prompts::{EVIDENCE_INSTRUCTION, JSON_ONLY_SYSTEM};

pub fn assessment_system() -> String {
    format!(
        "You are an expert technical recruiter evaluating one candidate against one job \
         description. {JSON_ONLY_SYSTEM} {EVIDENCE_INSTRUCTION}"
    )
}

/// Placeholders: `{jd_text}`, `{candidate_profile}`.
pub const ASSESSMENT_PROMPT_TEMPLATE: &str = r#"Score the candidate below against the job description.

SCORING RUBRIC (each sub-score is a number from 0 to 100)
1) experience_score: relevance and tenure. Compare required years and how directly past roles match the role's scope.
2) skills_score: coverage of REQUIRED skills. Separate required from nice-to-have; reward evidence of use in work or projects, not bare keyword listing.
3) education_score: how well degrees and credentials match the stated requirements.
4) projects_score: complexity and relevance. Reward production-like, real-world work that exercises the required stack.

Do NOT compute a final or overall score. It is computed separately from your four sub-scores.

Return exactly this JSON shape:
{
  "experience_score": <number 0-100>,
  "skills_score": <number 0-100>,
  "education_score": <number 0-100>,
  "projects_score": <number 0-100>,
  "strengths": ["<short, evidence-based>", ...],
  "gaps": ["<short, evidence-based>", ...],
  "reasoning": "<one or two high-signal sentences>"
}

JOB DESCRIPTION:
{jd_text}

CANDIDATE PROFILE:
{candidate_profile}
"#;
