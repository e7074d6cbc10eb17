//! Interview Call Dispatcher — asks the telephony/agent provider to place a
//! screening call, carrying the application id as correlation metadata.
//!
//! The provider acknowledges immediately; call progress and the final
//! outcome arrive asynchronously on the webhook endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use crate::config::Config;
use crate::errors::AppError;
use crate::scheduler::CallTask;

const DISPATCH_TIMEOUT_SECS: u64 = 30;

/// Parameters for one outbound screening call.
#[derive(Debug, Clone)]
pub struct CallRequest {
    pub application_id: Uuid,
    pub phone: String,
    pub candidate_name: String,
    pub job_title: String,
}

impl CallRequest {
    pub fn from_task(task: &CallTask) -> Self {
        Self {
            application_id: task.application_id,
            phone: task.phone.clone(),
            candidate_name: task.candidate_name.clone(),
            job_title: task.job_title.clone(),
        }
    }
}

/// Pluggable telephony dispatcher; tests substitute a recorder.
#[async_trait]
pub trait CallDispatcher: Send + Sync {
    async fn place_call(&self, request: &CallRequest) -> Result<(), AppError>;
}

/// Production dispatcher talking to the external telephony/agent API.
pub struct HttpCallDispatcher {
    client: Client,
    api_url: String,
    api_key: String,
    callback_url: String,
    webhook_secret: String,
}

impl HttpCallDispatcher {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(DISPATCH_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            api_url: config.telephony_api_url.clone(),
            api_key: config.telephony_api_key.clone(),
            callback_url: callback_url(&config.public_base_url),
            webhook_secret: config.webhook_secret.clone(),
        }
    }
}

#[async_trait]
impl CallDispatcher for HttpCallDispatcher {
    async fn place_call(&self, request: &CallRequest) -> Result<(), AppError> {
        let payload = json!({
            "phone_number": request.phone,
            "task": screening_task(&request.candidate_name, &request.job_title),
            "voice": "maya",
            "language": "en",
            "webhook": self.callback_url,
            "metadata": {
                "application_id": request.application_id,
            },
            "headers": {
                "X-Webhook-Secret": self.webhook_secret,
            },
        });

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::Telephony(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Telephony(format!(
                "provider returned {status}: {body}"
            )));
        }

        debug!(application_id = %request.application_id, "Call dispatch acknowledged");
        Ok(())
    }
}

/// The agent's task description for a screening call.
fn screening_task(candidate_name: &str, job_title: &str) -> String {
    format!(
        "Conduct a screening interview for {candidate_name} applying for {job_title}. \
         Ask about experience, skills, and communication ability."
    )
}

fn callback_url(public_base_url: &str) -> String {
    format!(
        "{}/api/v1/applications/call-webhook",
        public_base_url.trim_end_matches('/')
    )
}
