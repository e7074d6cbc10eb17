//! Interview Evaluator Adapter — scores a completed call transcript against
//! the job description.
//!
//! Unlike the semantic resume scorer there is NO fabricated fallback here:
//! inventing interview scores would corrupt the shortlist decision. On
//! failure the webhook flow parks the application in `evaluation_failed`
//! and surfaces it to the recruiter.

use async_trait::async_trait;
use serde::Deserialize;

use crate::llm_client::{LlmClient, LlmError};

const EVALUATION_SYSTEM: &str = "You are a senior technical interviewer evaluating a candidate's \
    screening call transcript. You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

const EVALUATION_PROMPT_TEMPLATE: &str = r#"Evaluate the candidate interview.

Job Description:
{jd}

Transcript:
{transcript}

Return a JSON object with this EXACT schema (no extra fields):
{
    "communication_score": 0-100,
    "technical_score": 0-100,
    "confidence_score": 0-100,
    "voice_score": 0-100,
    "strengths": "2-3 bullet points",
    "weaknesses": "2-3 bullet points",
    "recommendation": "Hire | Hold | Reject",
    "feedback": "short professional feedback"
}"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Recommendation {
    #[serde(alias = "hire", alias = "HIRE")]
    Hire,
    #[serde(alias = "hold", alias = "HOLD")]
    Hold,
    #[serde(alias = "reject", alias = "REJECT")]
    Reject,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Hire => "Hire",
            Recommendation::Hold => "Hold",
            Recommendation::Reject => "Reject",
        }
    }
}

/// Structured output of an interview evaluation. `voice_score` drives the
/// shortlist decision; the other three are recruiter-facing detail.
#[derive(Debug, Clone, Deserialize)]
pub struct InterviewAssessment {
    pub communication_score: i32,
    pub technical_score: i32,
    pub confidence_score: i32,
    pub voice_score: i32,
    #[serde(default)]
    pub strengths: String,
    #[serde(default)]
    pub weaknesses: String,
    pub recommendation: Recommendation,
    #[serde(default)]
    pub feedback: String,
}

impl InterviewAssessment {
    fn clamp_scores(mut self) -> Self {
        self.communication_score = self.communication_score.clamp(0, 100);
        self.technical_score = self.technical_score.clamp(0, 100);
        self.confidence_score = self.confidence_score.clamp(0, 100);
        self.voice_score = self.voice_score.clamp(0, 100);
        self
    }
}

/// Pluggable evaluator; tests substitute a stub.
#[async_trait]
pub trait InterviewEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        transcript: &str,
        job_description: &str,
    ) -> Result<InterviewAssessment, LlmError>;
}

/// Production evaluator backed by the shared LLM client.
pub struct LlmInterviewEvaluator {
    llm: LlmClient,
}

impl LlmInterviewEvaluator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl InterviewEvaluator for LlmInterviewEvaluator {
    async fn evaluate(
        &self,
        transcript: &str,
        job_description: &str,
    ) -> Result<InterviewAssessment, LlmError> {
        let prompt = EVALUATION_PROMPT_TEMPLATE
            .replace("{jd}", job_description)
            .replace("{transcript}", transcript);

        let assessment = self
            .llm
            .call_json::<InterviewAssessment>(&prompt, EVALUATION_SYSTEM)
            .await?;

        Ok(assessment.clamp_scores())
    }
}
