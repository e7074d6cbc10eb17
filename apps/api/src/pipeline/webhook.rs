//! Webhook Event Processor — consumes asynchronous call-outcome events from
//! the telephony provider and drives state transitions.
//!
//! The provider must never be provoked into a redelivery storm: once the
//! shared secret checks out, every syntactically valid payload is
//! acknowledged 2xx — malformed JSON, unknown applications and unrecognized
//! outcomes all get a soft diagnostic with no state change.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{application::ApplicationRow, job::JobRow};
use crate::pipeline::machine::{after_evaluation, plan_call_outcome, FinalDecision, OutcomePlan};
use crate::pipeline::status::{ApplicationStatus, CallOutcome};
use crate::scheduler::CallTask;
use crate::state::AppState;

/// Inbound call event. Unknown fields are ignored; timestamps are parsed
/// leniently so one odd field never voids a whole `completed` delivery.
#[derive(Debug, Deserialize)]
pub struct CallEventPayload {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub metadata: CallMetadata,
    #[serde(default)]
    pub concatenated_transcript: Option<String>,
    #[serde(default)]
    pub corrected_duration: Option<f64>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub ended_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CallMetadata {
    #[serde(default)]
    pub application_id: Option<Uuid>,
}

fn ack(message: impl Into<String>) -> Response {
    (StatusCode::OK, Json(json!({ "message": message.into() }))).into_response()
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// POST /api/v1/applications/call-webhook
pub async fn handle_call_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    // Webhook authenticity: the provider echoes back the shared secret we
    // hand it at dispatch time. Unauthenticated deliveries are hard-rejected.
    let secret = headers
        .get("x-webhook-secret")
        .and_then(|v| v.to_str().ok());
    if secret != Some(state.config.webhook_secret.as_str()) {
        warn!("Webhook delivery rejected: missing or invalid secret");
        return AppError::Forbidden.into_response();
    }

    let payload: CallEventPayload = match serde_json::from_str(&body) {
        Ok(p) => p,
        Err(e) => {
            warn!("Webhook delivery with malformed JSON: {e}");
            return ack("Invalid JSON payload");
        }
    };

    match process_event(&state, payload).await {
        Ok(response) => response,
        Err(e) => {
            // Still a 2xx: a hard failure here only triggers provider-side
            // redelivery against the same broken state.
            error!("Webhook event processing failed: {e}");
            ack("Event processing failed")
        }
    }
}

async fn process_event(state: &AppState, payload: CallEventPayload) -> Result<Response, AppError> {
    let Some(application_id) = payload.metadata.application_id else {
        return Ok(ack("Missing application_id"));
    };

    let Some(outcome) = payload
        .status
        .as_deref()
        .and_then(CallOutcome::parse)
    else {
        return Ok(ack("Ignoring unrecognized event"));
    };

    let lock = state.locks.lock_for(application_id).await;

    if outcome == CallOutcome::Completed {
        return process_completed(state, application_id, payload, lock).await;
    }

    // Progress and failure outcomes involve no external calls, so the whole
    // load-decide-persist window sits under the lock.
    let _guard = lock.lock().await;

    let Some(app) = fetch_application(state, application_id).await? else {
        return Ok(ack("Application not found"));
    };
    let current = current_status(&app);
    let plan = plan_call_outcome(
        current,
        outcome,
        app.retry_count,
        state.config.max_call_retries,
        false,
    );

    match plan {
        OutcomePlan::Ignore(reason) => Ok(ack(reason)),
        OutcomePlan::MarkInProgress => {
            sqlx::query("UPDATE applications SET status = $1 WHERE id = $2")
                .bind(ApplicationStatus::InterviewInProgress.as_str())
                .bind(application_id)
                .execute(&state.db)
                .await?;
            Ok(ack("Interview started"))
        }
        OutcomePlan::Retry {
            status,
            retry_count,
        } => {
            // Job row first: the retry budget is only consumed when a new
            // task actually gets scheduled.
            let Some(job) = fetch_job(state, app.job_id).await? else {
                return Ok(ack("Job not found"));
            };

            sqlx::query("UPDATE applications SET status = $1, retry_count = $2 WHERE id = $3")
                .bind(status.as_str())
                .bind(retry_count)
                .bind(application_id)
                .execute(&state.db)
                .await?;

            let delay = std::time::Duration::from_secs(state.config.call_delay_secs);
            state
                .scheduler
                .schedule(retry_task(&app, &job, retry_count, delay), delay)
                .await;
            info!(%application_id, retry_count, "Call retry scheduled");
            Ok(ack("Retry scheduled"))
        }
        OutcomePlan::ExhaustedFailure { status } => {
            sqlx::query("UPDATE applications SET status = $1 WHERE id = $2")
                .bind(status.as_str())
                .bind(application_id)
                .execute(&state.db)
                .await?;
            info!(%application_id, status = status.as_str(), "Call retries exhausted");
            Ok(ack(format!("Call ended with status: {}", status.as_str())))
        }
        // Completed is routed above.
        OutcomePlan::Evaluate => Ok(ack("Ignoring unrecognized event")),
    }
}

/// Handles a `completed` delivery: evaluate the transcript, persist the
/// interview and scores, and issue the final shortlist/reject decision.
///
/// The evaluator call happens BEFORE the lock is taken — external calls
/// must not hold the application's write lock. The dedup/terminal checks
/// run twice: a cheap pre-check to avoid a pointless LLM call, and the
/// authoritative one under the lock before persisting.
async fn process_completed(
    state: &AppState,
    application_id: Uuid,
    payload: CallEventPayload,
    lock: std::sync::Arc<tokio::sync::Mutex<()>>,
) -> Result<Response, AppError> {
    let Some(app) = fetch_application(state, application_id).await? else {
        return Ok(ack("Application not found"));
    };

    let already = already_evaluated(state, &app).await?;
    if let OutcomePlan::Ignore(reason) = plan_call_outcome(
        current_status(&app),
        CallOutcome::Completed,
        app.retry_count,
        state.config.max_call_retries,
        already,
    ) {
        return Ok(ack(reason));
    }

    let Some(transcript) = payload
        .concatenated_transcript
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
    else {
        return Ok(ack("Missing transcript"));
    };

    let Some(job) = fetch_job(state, app.job_id).await? else {
        return Ok(ack("Job not found"));
    };

    let evaluation = state
        .evaluator
        .evaluate(transcript, job.description.as_deref().unwrap_or_default())
        .await;

    let duration_secs = payload.corrected_duration.unwrap_or(0.0) as i32;
    let started_at = parse_timestamp(payload.started_at.as_deref());
    let ended_at = parse_timestamp(payload.ended_at.as_deref());

    let _guard = lock.lock().await;

    // Authoritative re-check: another delivery may have won the race while
    // the evaluator ran.
    let Some(app) = fetch_application(state, application_id).await? else {
        return Ok(ack("Application not found"));
    };
    let already = already_evaluated(state, &app).await?;
    if let OutcomePlan::Ignore(reason) = plan_call_outcome(
        current_status(&app),
        CallOutcome::Completed,
        app.retry_count,
        state.config.max_call_retries,
        already,
    ) {
        return Ok(ack(reason));
    }

    match evaluation {
        Err(e) => {
            error!(%application_id, "Interview evaluation failed: {e}");
            let mut tx = state.db.begin().await?;
            upsert_interview(
                &mut tx,
                application_id,
                transcript,
                duration_secs,
                started_at,
                ended_at,
                None,
            )
            .await?;
            sqlx::query("UPDATE applications SET status = $1 WHERE id = $2")
                .bind(ApplicationStatus::EvaluationFailed.as_str())
                .bind(application_id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok(ack("Interview evaluation failed; flagged for recruiter review"))
        }
        Ok(assessment) => {
            let decision = after_evaluation(assessment.voice_score, job.interview_min_score);
            let final_status = match decision {
                FinalDecision::Shortlisted => ApplicationStatus::Shortlisted,
                FinalDecision::Rejected => ApplicationStatus::Rejected,
            };

            let mut tx = state.db.begin().await?;
            upsert_interview(
                &mut tx,
                application_id,
                transcript,
                duration_secs,
                started_at,
                ended_at,
                Some(&assessment),
            )
            .await?;
            sqlx::query(
                "UPDATE applications \
                 SET voice_score = $1, communication_score = $2, technical_score = $3, \
                     confidence_score = $4, interview_feedback = $5, retry_count = 0, status = $6 \
                 WHERE id = $7",
            )
            .bind(assessment.voice_score)
            .bind(assessment.communication_score)
            .bind(assessment.technical_score)
            .bind(assessment.confidence_score)
            .bind(&assessment.feedback)
            .bind(final_status.as_str())
            .bind(application_id)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;

            // Terminal now: any stale scheduled call for this application
            // is dropped.
            state.scheduler.cancel(application_id).await;

            info!(
                %application_id,
                voice_score = assessment.voice_score,
                status = final_status.as_str(),
                "Interview evaluated"
            );
            Ok(ack("Interview processed successfully"))
        }
    }
}

fn current_status(app: &ApplicationRow) -> ApplicationStatus {
    ApplicationStatus::parse(&app.status).unwrap_or_else(|| {
        warn!(application_id = %app.id, status = %app.status, "Unknown stored status");
        ApplicationStatus::Applied
    })
}

/// Replay dedup: a prior `completed` delivery was fully processed iff the
/// interview already holds a transcript AND the application carries a voice
/// score. An `evaluation_failed` application has the transcript but no
/// score, so a redelivery legitimately retries the evaluation.
async fn already_evaluated(state: &AppState, app: &ApplicationRow) -> Result<bool, AppError> {
    if app.voice_score.is_none() {
        return Ok(false);
    }
    let has_transcript: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM interviews WHERE application_id = $1 AND transcript IS NOT NULL)",
    )
    .bind(app.id)
    .fetch_one(&state.db)
    .await?;
    Ok(has_transcript)
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

async fn fetch_job(state: &AppState, id: Uuid) -> Result<Option<JobRow>, AppError> {
    let job = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?;
    Ok(job)
}

fn retry_task(
    app: &ApplicationRow,
    job: &JobRow,
    attempt: i32,
    delay: std::time::Duration,
) -> CallTask {
    CallTask {
        id: Uuid::new_v4(),
        application_id: app.id,
        phone: app.candidate_phone.clone(),
        candidate_name: app.candidate_name.clone(),
        job_title: job.title.clone(),
        attempt,
        due_at: Utc::now()
            + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero()),
    }
}

async fn upsert_interview(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    application_id: Uuid,
    transcript: &str,
    duration_secs: i32,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    assessment: Option<&crate::interview::evaluator::InterviewAssessment>,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO interviews \
             (id, application_id, transcript, duration_secs, started_at, ended_at, \
              strengths, weaknesses, recommendation) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         ON CONFLICT (application_id) DO UPDATE \
         SET transcript = EXCLUDED.transcript, \
             duration_secs = EXCLUDED.duration_secs, \
             started_at = EXCLUDED.started_at, \
             ended_at = EXCLUDED.ended_at, \
             strengths = EXCLUDED.strengths, \
             weaknesses = EXCLUDED.weaknesses, \
             recommendation = EXCLUDED.recommendation",
    )
    .bind(Uuid::new_v4())
    .bind(application_id)
    .bind(transcript)
    .bind(duration_secs)
    .bind(started_at)
    .bind(ended_at)
    .bind(assessment.map(|a| a.strengths.as_str()))
    .bind(assessment.map(|a| a.weaknesses.as_str()))
    .bind(assessment.map(|a| a.recommendation.as_str()))
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_parses_full_completed_event() {
        let raw = r#"{
            "status": "completed",
            "metadata": {"application_id": "7f2c1e32-9a50-4c8e-bd1f-0f4d2a6b3c11"},
            "concatenated_transcript": "agent: hello\ncandidate: hi",
            "corrected_duration": 312.4,
            "started_at": "2025-06-01T10:00:00Z",
            "ended_at": "2025-06-01T10:05:12Z",
            "call_id": "ignored-extra-field"
        }"#;
        let payload: CallEventPayload = serde_json::from_str(raw).unwrap();
        assert_eq!(payload.status.as_deref(), Some("completed"));
        assert!(payload.metadata.application_id.is_some());
        assert_eq!(payload.corrected_duration, Some(312.4));
    }

    #[test]
    fn test_payload_tolerates_missing_metadata() {
        let payload: CallEventPayload =
            serde_json::from_str(r#"{"status": "no_answer"}"#).unwrap();
        assert!(payload.metadata.application_id.is_none());
        assert!(payload.concatenated_transcript.is_none());
    }

    #[test]
    fn test_payload_rejects_non_json() {
        assert!(serde_json::from_str::<CallEventPayload>("not json at all").is_err());
    }

    #[test]
    fn test_parse_timestamp_accepts_rfc3339() {
        let ts = parse_timestamp(Some("2025-06-01T10:00:00Z")).unwrap();
        assert_eq!(ts.timestamp(), 1748772000);
    }

    #[test]
    fn test_parse_timestamp_tolerates_garbage() {
        assert!(parse_timestamp(Some("last tuesday")).is_none());
        assert!(parse_timestamp(None).is_none());
    }
}
