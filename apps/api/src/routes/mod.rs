pub mod health;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::jobs;
use crate::pipeline::{handlers, webhook};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Jobs API
        .route(
            "/api/v1/jobs",
            get(jobs::handle_list_jobs).post(jobs::handle_create_job),
        )
        .route("/api/v1/jobs/my", get(jobs::handle_my_jobs))
        .route("/api/v1/jobs/:job_id", get(jobs::handle_get_job))
        .route(
            "/api/v1/jobs/:job_id/status",
            patch(jobs::handle_update_job_status),
        )
        // Applications API
        .route("/api/v1/applications", post(handlers::handle_apply))
        .route(
            "/api/v1/applications/my",
            get(handlers::handle_my_applications),
        )
        .route(
            "/api/v1/applications/job/:job_id",
            get(handlers::handle_job_applications),
        )
        .route(
            "/api/v1/applications/:id/resume",
            post(handlers::handle_score_resume),
        )
        .route(
            "/api/v1/applications/:id/transcript",
            get(handlers::handle_transcript),
        )
        .route(
            "/api/v1/applications/:id/status",
            patch(handlers::handle_override_status),
        )
        // Telephony provider callback (secret-gated, no Actor headers)
        .route(
            "/api/v1/applications/call-webhook",
            post(webhook::handle_call_webhook),
        )
        .with_state(state)
}
