// Cross-cutting prompt fragments. Each LLM consumer keeps its own prompts.rs
// next to it and composes these in.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Keeps strengths and gaps tied to what the candidate profile actually shows.
pub const EVIDENCE_INSTRUCTION: &str = "\
    CRITICAL: Every strength and gap must be grounded in the candidate profile or the \
    job description as given. Do NOT infer credentials, tenure, or skills that are not \
    stated. A listed keyword without evidence of use counts as weak evidence.";
