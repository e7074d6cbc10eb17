//! Job posting handlers. Jobs carry the two pipeline thresholds; a missing
//! threshold disables that gate rather than failing the pipeline.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::{Actor, Role};
use crate::errors::AppError;
use crate::models::job::{JobRow, JobStatus};
use crate::state::AppState;

const DEFAULT_RESUME_MIN_SCORE: i32 = 40;
const DEFAULT_INTERVIEW_MIN_SCORE: i32 = 60;

#[derive(Deserialize)]
pub struct CreateJobRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub resume_min_score: Option<i32>,
    #[serde(default)]
    pub interview_min_score: Option<i32>,
}

/// POST /api/v1/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    actor: Actor,
    Json(req): Json<CreateJobRequest>,
) -> Result<Json<JobRow>, AppError> {
    actor.require_role(Role::Recruiter)?;

    if req.title.trim().is_empty() {
        return Err(AppError::Validation("title must not be empty".to_string()));
    }
    for (name, value) in [
        ("resume_min_score", req.resume_min_score),
        ("interview_min_score", req.interview_min_score),
    ] {
        if let Some(v) = value {
            if !(0..=100).contains(&v) {
                return Err(AppError::Validation(format!("{name} must be in 0..=100")));
            }
        }
    }

    let job = sqlx::query_as::<_, JobRow>(
        "INSERT INTO jobs (id, recruiter_id, title, description, status, \
                           resume_min_score, interview_min_score) \
         VALUES ($1, $2, $3, $4, 'open', $5, $6) \
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(actor.id)
    .bind(req.title.trim())
    .bind(&req.description)
    .bind(req.resume_min_score.unwrap_or(DEFAULT_RESUME_MIN_SCORE))
    .bind(req.interview_min_score.unwrap_or(DEFAULT_INTERVIEW_MIN_SCORE))
    .fetch_one(&state.db)
    .await?;

    info!(job_id = %job.id, title = %job.title, "Job created");
    Ok(Json(job))
}

/// GET /api/v1/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
) -> Result<Json<Vec<JobRow>>, AppError> {
    let jobs = sqlx::query_as::<_, JobRow>(
        "SELECT * FROM jobs WHERE status = 'open' ORDER BY created_at DESC",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(jobs))
}

/// GET /api/v1/jobs/my
pub async fn handle_my_jobs(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<Vec<JobRow>>, AppError> {
    actor.require_role(Role::Recruiter)?;

    let jobs = sqlx::query_as::<_, JobRow>(
        "SELECT * FROM jobs WHERE recruiter_id = $1 ORDER BY created_at DESC",
    )
    .bind(actor.id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(jobs))
}

/// GET /api/v1/jobs/:job_id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobRow>, AppError> {
    let job = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1")
        .bind(job_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".to_string()))?;
    Ok(Json(job))
}

#[derive(Deserialize)]
pub struct UpdateJobStatusRequest {
    pub status: String,
}

/// PATCH /api/v1/jobs/:job_id/status
///
/// Open/close toggle. Closing a job stops new applications; applications
/// already in the pipeline keep running.
pub async fn handle_update_job_status(
    State(state): State<AppState>,
    actor: Actor,
    Path(job_id): Path<Uuid>,
    Json(req): Json<UpdateJobStatusRequest>,
) -> Result<Json<JobRow>, AppError> {
    actor.require_role(Role::Recruiter)?;

    let new_status = JobStatus::parse(&req.status).ok_or_else(|| {
        AppError::Validation("status must be 'open' or 'closed'".to_string())
    })?;

    let job = sqlx::query_as::<_, JobRow>(
        "UPDATE jobs SET status = $1 WHERE id = $2 AND recruiter_id = $3 RETURNING *",
    )
    .bind(new_status.as_str())
    .bind(job_id)
    .bind(actor.id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("Job not found".to_string()))?;

    info!(%job_id, status = new_status.as_str(), "Job status updated");
    Ok(Json(job))
}
