//! Semantic Scorer — LLM relevance assessment of a resume against a job
//! description.
//!
//! Infallible by contract: the pipeline must complete even when the AI
//! provider is down, so implementations absorb every call/parse failure and
//! return `SemanticAssessment::fallback()` instead of an error.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::llm_client::LlmClient;

/// Bounded prefixes sent to the model; anything longer adds cost without
/// improving the assessment.
const RESUME_PREFIX_CHARS: usize = 4000;
const JD_PREFIX_CHARS: usize = 3000;

const SCORING_SYSTEM: &str = "You are an AI HR evaluator comparing a resume against a job \
    description. You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

const SCORING_PROMPT_TEMPLATE: &str = r#"Compare the resume with the job description carefully.

Resume:
{resume}

Job Description:
{jd}

Return a JSON object with this EXACT schema (no extra fields):
{
    "score": 0-100,
    "missing_skills": ["skill the JD requires that the resume lacks"],
    "reason": "one-sentence justification"
}"#;

/// Structured output of a semantic scoring call.
#[derive(Debug, Clone, Deserialize)]
pub struct SemanticAssessment {
    pub score: i32,
    #[serde(default)]
    pub missing_skills: Vec<String>,
    #[serde(default)]
    pub reason: String,
}

impl SemanticAssessment {
    /// Safe fallback used whenever the AI provider is unreachable or returns
    /// garbage. A neutral 60 keeps marginal candidates in the pipeline for
    /// the interview stage to sort out.
    pub fn fallback() -> Self {
        Self {
            score: 60,
            missing_skills: Vec::new(),
            reason: "AI scoring temporarily unavailable".to_string(),
        }
    }
}

/// Pluggable semantic scorer. Carried in `AppState` as `Arc<dyn SemanticScorer>`
/// so tests can substitute a deterministic stub.
#[async_trait]
pub trait SemanticScorer: Send + Sync {
    async fn assess(&self, resume_text: &str, job_description: &str) -> SemanticAssessment;
}

/// Production scorer backed by the shared LLM client.
pub struct LlmSemanticScorer {
    llm: LlmClient,
}

impl LlmSemanticScorer {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl SemanticScorer for LlmSemanticScorer {
    async fn assess(&self, resume_text: &str, job_description: &str) -> SemanticAssessment {
        let prompt = SCORING_PROMPT_TEMPLATE
            .replace("{resume}", truncate_chars(resume_text, RESUME_PREFIX_CHARS))
            .replace("{jd}", truncate_chars(job_description, JD_PREFIX_CHARS));

        match self
            .llm
            .call_json::<SemanticAssessment>(&prompt, SCORING_SYSTEM)
            .await
        {
            Ok(mut assessment) => {
                assessment.score = assessment.score.clamp(0, 100);
                assessment
            }
            Err(e) => {
                warn!("Semantic scoring failed, using fallback: {e}");
                SemanticAssessment::fallback()
            }
        }
    }
}

/// Truncates to at most `max` characters on a char boundary.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_shorter_than_limit_is_unchanged() {
        assert_eq!(truncate_chars("short resume", 4000), "short resume");
    }

    #[test]
    fn test_truncate_cuts_at_limit() {
        let long = "a".repeat(5000);
        assert_eq!(truncate_chars(&long, 4000).len(), 4000);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "résumé ".repeat(1000);
        let cut = truncate_chars(&text, 4000);
        assert_eq!(cut.chars().count(), 4000);
    }

    #[test]
    fn test_fallback_shape() {
        let fb = SemanticAssessment::fallback();
        assert_eq!(fb.score, 60);
        assert!(fb.missing_skills.is_empty());
        assert_eq!(fb.reason, "AI scoring temporarily unavailable");
    }

    #[test]
    fn test_assessment_deserializes_with_missing_optional_fields() {
        let assessment: SemanticAssessment = serde_json::from_str("{\"score\": 72}").unwrap();
        assert_eq!(assessment.score, 72);
        assert!(assessment.missing_skills.is_empty());
        assert!(assessment.reason.is_empty());
    }
}
