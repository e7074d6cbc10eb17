//! Production `CallSink`: re-checks the application at fire time, then
//! places the call through the telephony dispatcher.
//!
//! A task can outlive its relevance — the application may have been rejected
//! or shortlisted while the timer ran. Firing against a terminal application
//! is a logged no-op, never an error.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{error, info, warn};

use crate::interview::dispatcher::{CallDispatcher, CallRequest};
use crate::pipeline::status::ApplicationStatus;
use crate::scheduler::{CallSink, CallTask};

pub struct DispatchSink {
    db: PgPool,
    dispatcher: Arc<dyn CallDispatcher>,
}

impl DispatchSink {
    pub fn new(db: PgPool, dispatcher: Arc<dyn CallDispatcher>) -> Self {
        Self { db, dispatcher }
    }
}

#[async_trait]
impl CallSink for DispatchSink {
    async fn fire(&self, task: CallTask) {
        let status: Option<String> =
            match sqlx::query_scalar("SELECT status FROM applications WHERE id = $1")
                .bind(task.application_id)
                .fetch_optional(&self.db)
                .await
            {
                Ok(s) => s,
                Err(e) => {
                    error!(
                        application_id = %task.application_id,
                        "Failed to load application before dispatch: {e}"
                    );
                    return;
                }
            };

        let Some(status) = status else {
            warn!(
                application_id = %task.application_id,
                "Scheduled call for a missing application; dropping"
            );
            return;
        };

        if ApplicationStatus::parse(&status).is_some_and(|s| s.is_terminal()) {
            info!(
                application_id = %task.application_id,
                status,
                "Application is terminal; skipping scheduled call"
            );
            return;
        }

        info!(
            application_id = %task.application_id,
            attempt = task.attempt,
            "Dispatching interview call"
        );

        // Dispatch failure is logged, not retried here: the provider reports
        // call outcomes through the webhook, and a silent application is
        // visible to the recruiter as a stuck interview_scheduled row.
        if let Err(e) = self.dispatcher.place_call(&CallRequest::from_task(&task)).await {
            error!(
                application_id = %task.application_id,
                "Interview call dispatch failed: {e}"
            );
        }
    }
}
