//! Hybrid Score Blender — combines the lexical and semantic scores under a
//! threshold-gated weighting policy.
//!
//! Below `SEMANTIC_GATE` the semantic scorer is never invoked: a resume with
//! almost no keyword overlap is not worth an AI call. Between the gate and
//! `HIGH_LEXICAL` the lexical score dominates (the semantic scorer over- and
//! under-credits marginal matches); at or above `HIGH_LEXICAL` the lexical
//! overlap already indicates a plausible match and the semantic judgment
//! gets the larger weight.

use crate::scoring::semantic::SemanticScorer;

/// Lexical score below which the semantic scorer is skipped entirely.
const SEMANTIC_GATE: i32 = 35;
/// Lexical score at which the weighting flips toward the semantic score.
const HIGH_LEXICAL: i32 = 60;

/// The blended result persisted onto an application.
#[derive(Debug, Clone)]
pub struct ResumeScore {
    pub score: i32,
    pub reason: String,
    pub missing_skills: Vec<String>,
}

/// Blends a precomputed lexical score with an on-demand semantic assessment.
pub async fn blend_resume_score(
    lexical: i32,
    resume_text: &str,
    job_description: &str,
    scorer: &dyn SemanticScorer,
) -> ResumeScore {
    if lexical < SEMANTIC_GATE {
        return ResumeScore {
            score: lexical,
            reason: "Low keyword similarity".to_string(),
            missing_skills: Vec::new(),
        };
    }

    let assessment = scorer.assess(resume_text, job_description).await;
    let ai = assessment.score;

    let blended = if lexical < HIGH_LEXICAL {
        0.7 * lexical as f64 + 0.3 * ai as f64
    } else {
        0.4 * lexical as f64 + 0.6 * ai as f64
    };

    ResumeScore {
        score: blended.floor() as i32,
        reason: assessment.reason,
        missing_skills: assessment.missing_skills,
    }
}
