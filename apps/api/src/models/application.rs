#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One candidate's pursuit of one job.
///
/// `status` is stored as text; parse through `ApplicationStatus` before
/// making transition decisions. The four interview scores and the feedback
/// stay NULL until a completed call has been evaluated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_id: Uuid,
    /// Contact details captured at apply time; the identity service owns the
    /// canonical record, but the dispatcher needs these at call time.
    pub candidate_name: String,
    pub candidate_phone: String,
    pub status: String,
    pub resume_score: Option<i32>,
    pub ai_reason: Option<String>,
    pub missing_skills: Option<String>,
    pub voice_score: Option<i32>,
    pub communication_score: Option<i32>,
    pub technical_score: Option<i32>,
    pub confidence_score: Option<i32>,
    pub interview_feedback: Option<String>,
    pub retry_count: i32,
    pub created_at: DateTime<Utc>,
}

impl ApplicationRow {
    /// Mean of the non-null scores, shown on the recruiter dashboard.
    pub fn performance_score(&self) -> Option<f64> {
        let parts = [
            self.resume_score,
            self.voice_score,
            self.communication_score,
            self.technical_score,
            self.confidence_score,
        ];
        let valid: Vec<i32> = parts.into_iter().flatten().collect();
        if valid.is_empty() {
            return None;
        }
        let mean = valid.iter().sum::<i32>() as f64 / valid.len() as f64;
        Some((mean * 100.0).round() / 100.0)
    }
}
