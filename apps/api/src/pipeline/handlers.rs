//! Application lifecycle handlers: apply, resume scoring, listings,
//! transcript access, recruiter override.
//!
//! Handlers stay thin: scoring happens in `scoring::*`, transition decisions
//! in `machine`, and every read-modify-write on an application row runs
//! under its per-application lock. External calls (semantic scoring) happen
//! before the lock is taken.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{Actor, Role};
use crate::errors::AppError;
use crate::models::application::ApplicationRow;
use crate::models::interview::InterviewRow;
use crate::models::job::JobRow;
use crate::pipeline::machine::{after_resume_score, is_allowed_override, ResumeDecision};
use crate::pipeline::status::ApplicationStatus;
use crate::scheduler::CallTask;
use crate::scoring::blend::blend_resume_score;
use crate::scoring::lexical::lexical_score;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ApplyRequest {
    pub job_id: Uuid,
    pub candidate_name: String,
    pub candidate_phone: String,
}

/// POST /api/v1/applications
pub async fn handle_apply(
    State(state): State<AppState>,
    actor: Actor,
    Json(req): Json<ApplyRequest>,
) -> Result<Json<ApplicationRow>, AppError> {
    actor.require_role(Role::Candidate)?;

    let job = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1")
        .bind(req.job_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".to_string()))?;

    if !job.is_open() {
        return Err(AppError::Validation("Job is closed".to_string()));
    }

    let application = sqlx::query_as::<_, ApplicationRow>(
        "INSERT INTO applications (id, user_id, job_id, candidate_name, candidate_phone, status) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(actor.id)
    .bind(req.job_id)
    .bind(&req.candidate_name)
    .bind(&req.candidate_phone)
    .bind(ApplicationStatus::Applied.as_str())
    .fetch_one(&state.db)
    .await?;

    info!(application_id = %application.id, job_id = %req.job_id, "New application");
    Ok(Json(application))
}

/// GET /api/v1/applications/my
pub async fn handle_my_applications(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<Vec<ApplicationRow>>, AppError> {
    let applications = sqlx::query_as::<_, ApplicationRow>(
        "SELECT * FROM applications WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(actor.id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(applications))
}

#[derive(Serialize)]
pub struct JobApplicationSummary {
    pub application_id: Uuid,
    pub user_id: Uuid,
    pub candidate_name: String,
    pub resume_score: Option<i32>,
    pub voice_score: Option<i32>,
    pub performance_score: Option<f64>,
    pub communication_score: Option<i32>,
    pub technical_score: Option<i32>,
    pub confidence_score: Option<i32>,
    pub interview_feedback: Option<String>,
    pub status: String,
    pub applied_at: chrono::DateTime<chrono::Utc>,
}

/// GET /api/v1/applications/job/:job_id
pub async fn handle_job_applications(
    State(state): State<AppState>,
    actor: Actor,
    Path(job_id): Path<Uuid>,
) -> Result<Json<Vec<JobApplicationSummary>>, AppError> {
    actor.require_role(Role::Recruiter)?;

    sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1 AND recruiter_id = $2")
        .bind(job_id)
        .bind(actor.id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".to_string()))?;

    let applications = sqlx::query_as::<_, ApplicationRow>(
        "SELECT * FROM applications WHERE job_id = $1 \
         ORDER BY status DESC, voice_score DESC NULLS LAST, resume_score DESC NULLS LAST",
    )
    .bind(job_id)
    .fetch_all(&state.db)
    .await?;

    let summaries = applications
        .into_iter()
        .map(|app| JobApplicationSummary {
            application_id: app.id,
            user_id: app.user_id,
            candidate_name: app.candidate_name.clone(),
            resume_score: app.resume_score,
            voice_score: app.voice_score,
            performance_score: app.performance_score(),
            communication_score: app.communication_score,
            technical_score: app.technical_score,
            confidence_score: app.confidence_score,
            interview_feedback: app.interview_feedback.clone(),
            status: app.status.clone(),
            applied_at: app.created_at,
        })
        .collect();

    Ok(Json(summaries))
}

/// GET /api/v1/applications/:id/transcript
pub async fn handle_transcript(
    State(state): State<AppState>,
    actor: Actor,
    Path(application_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    actor.require_role(Role::Recruiter)?;

    let app = fetch_application(&state, application_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Application not found".to_string()))?;
    require_job_owner(&state, app.job_id, actor.id).await?;

    let interview = sqlx::query_as::<_, InterviewRow>(
        "SELECT * FROM interviews WHERE application_id = $1",
    )
    .bind(application_id)
    .fetch_optional(&state.db)
    .await?;

    match interview.filter(|i| i.transcript.is_some()) {
        Some(interview) => Ok(Json(json!({
            "application_id": application_id,
            "transcript": interview.transcript,
            "duration_secs": interview.duration_secs,
            "started_at": interview.started_at,
            "ended_at": interview.ended_at,
        }))),
        None => Ok(Json(json!({
            "application_id": application_id,
            "transcript": null,
            "message": "Transcript not available yet",
        }))),
    }
}

#[derive(Deserialize)]
pub struct ScoreResumeRequest {
    pub resume_text: String,
}

/// POST /api/v1/applications/:id/resume
///
/// Runs the full scoring pipeline: lexical score, threshold-gated semantic
/// blend, then the reject-or-schedule decision. The caller always gets a
/// concrete score and status, even when the semantic scorer is unavailable.
pub async fn handle_score_resume(
    State(state): State<AppState>,
    actor: Actor,
    Path(application_id): Path<Uuid>,
    Json(req): Json<ScoreResumeRequest>,
) -> Result<Json<Value>, AppError> {
    if req.resume_text.trim().is_empty() {
        return Err(AppError::Validation("resume_text must not be empty".to_string()));
    }

    let app = sqlx::query_as::<_, ApplicationRow>(
        "SELECT * FROM applications WHERE id = $1 AND user_id = $2",
    )
    .bind(application_id)
    .bind(actor.id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("Application not found".to_string()))?;

    let job = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1")
        .bind(app.job_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".to_string()))?;

    let jd = job.description.as_deref().unwrap_or_default();
    let lexical = lexical_score(&req.resume_text, jd);
    // May call the LLM; runs before the lock is taken.
    let blended =
        blend_resume_score(lexical, &req.resume_text, jd, state.semantic_scorer.as_ref()).await;
    let decision = after_resume_score(blended.score, job.resume_min_score);

    let status = match decision {
        ResumeDecision::Reject => ApplicationStatus::Rejected,
        ResumeDecision::ScheduleInterview => ApplicationStatus::InterviewScheduled,
    };

    let lock = state.locks.lock_for(application_id).await;
    let _guard = lock.lock().await;

    // A fresh upload resets everything downstream of the resume score.
    sqlx::query(
        "UPDATE applications \
         SET resume_score = $1, ai_reason = $2, missing_skills = $3, status = $4, \
             retry_count = 0, voice_score = NULL, communication_score = NULL, \
             technical_score = NULL, confidence_score = NULL, interview_feedback = NULL \
         WHERE id = $5",
    )
    .bind(blended.score)
    .bind(&blended.reason)
    .bind(blended.missing_skills.join(", "))
    .bind(status.as_str())
    .bind(application_id)
    .execute(&state.db)
    .await?;

    match decision {
        ResumeDecision::ScheduleInterview => {
            let delay = std::time::Duration::from_secs(state.config.call_delay_secs);
            state
                .scheduler
                .schedule(
                    CallTask {
                        id: Uuid::new_v4(),
                        application_id,
                        phone: app.candidate_phone.clone(),
                        candidate_name: app.candidate_name.clone(),
                        job_title: job.title.clone(),
                        attempt: 0,
                        due_at: chrono::Utc::now()
                            + chrono::Duration::from_std(delay)
                                .unwrap_or_else(|_| chrono::Duration::zero()),
                    },
                    delay,
                )
                .await;
            info!(
                %application_id,
                score = blended.score,
                "Resume scored; interview scheduled"
            );
        }
        ResumeDecision::Reject => {
            // A re-upload may land while an older call task is pending.
            state.scheduler.cancel(application_id).await;
            info!(%application_id, score = blended.score, "Resume scored; rejected");
        }
    }

    Ok(Json(json!({
        "message": "Resume scored",
        "resume_score": blended.score,
        "status": status.as_str(),
    })))
}

#[derive(Deserialize)]
pub struct OverrideStatusRequest {
    pub status: String,
}

/// PATCH /api/v1/applications/:id/status
///
/// Recruiter manual override, bypassing the automated pipeline. The only
/// path to `hired`. Allowed targets: shortlisted, rejected, hired.
pub async fn handle_override_status(
    State(state): State<AppState>,
    actor: Actor,
    Path(application_id): Path<Uuid>,
    Json(req): Json<OverrideStatusRequest>,
) -> Result<Json<Value>, AppError> {
    actor.require_role(Role::Recruiter)?;

    let new_status = ApplicationStatus::parse(&req.status)
        .filter(|s| is_allowed_override(*s))
        .ok_or_else(|| AppError::Validation("Invalid status".to_string()))?;

    let lock = state.locks.lock_for(application_id).await;
    let _guard = lock.lock().await;

    let app = fetch_application(&state, application_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Application not found".to_string()))?;
    require_job_owner(&state, app.job_id, actor.id).await?;

    if let Some(current) = ApplicationStatus::parse(&app.status) {
        if current.is_terminal() && current != new_status {
            warn!(
                %application_id,
                from = current.as_str(),
                to = new_status.as_str(),
                "Recruiter override resurrects a terminal application"
            );
        }
    }

    sqlx::query("UPDATE applications SET status = $1 WHERE id = $2")
        .bind(new_status.as_str())
        .bind(application_id)
        .execute(&state.db)
        .await?;

    // Manual decisions supersede any scheduled automation.
    state.scheduler.cancel(application_id).await;

    info!(%application_id, status = new_status.as_str(), "Status overridden");
    Ok(Json(json!({
        "message": "Status updated",
        "status": new_status.as_str(),
    })))
}

async fn fetch_application(
    state: &AppState,
    id: Uuid,
) -> Result<Option<ApplicationRow>, AppError> {
    let app = sqlx::query_as::<_, ApplicationRow>("SELECT * FROM applications WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?;
    Ok(app)
}

async fn require_job_owner(
    state: &AppState,
    job_id: Uuid,
    recruiter_id: Uuid,
) -> Result<(), AppError> {
    let owns: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM jobs WHERE id = $1 AND recruiter_id = $2)",
    )
    .bind(job_id)
    .bind(recruiter_id)
    .fetch_one(&state.db)
    .await?;
    if owns {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}
