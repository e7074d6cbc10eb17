#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One transcript/outcome record per application (0 or 1).
/// Created lazily on the first relevant webhook event, updated in place
/// thereafter — never duplicated for the same application.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InterviewRow {
    pub id: Uuid,
    pub application_id: Uuid,
    pub transcript: Option<String>,
    pub duration_secs: Option<i32>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub strengths: Option<String>,
    pub weaknesses: Option<String>,
    pub recommendation: Option<String>,
    pub created_at: DateTime<Utc>,
}
