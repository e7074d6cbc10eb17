#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Job listing status. Stored as text; `closed` stops new applications but
/// leaves in-flight ones alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Open,
    Closed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Open => "open",
            JobStatus::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<JobStatus> {
        match s {
            "open" => Some(JobStatus::Open),
            "closed" => Some(JobStatus::Closed),
            _ => None,
        }
    }
}

/// A job listing. Owns the two scoring thresholds the pipeline reads:
/// `resume_min_score` gates scheduling, `interview_min_score` gates the
/// final shortlist decision. `status` ("open"/"closed") gates new
/// applications.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub recruiter_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub resume_min_score: Option<i32>,
    pub interview_min_score: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl JobRow {
    pub fn is_open(&self) -> bool {
        JobStatus::parse(&self.status) == Some(JobStatus::Open)
    }
}
