//! Completion webhooks.
//!
//! After a run reaches a terminal state, a workflow that carries a
//! `webhook_url` is notified with a JSON summary of the run. Delivery is a
//! single POST; callers log failures and never let them change the run
//! outcome.

use std::time::Duration;

use serde::Serialize;
use stepwise_types::run::{RunStatus, WorkflowRun};
use thiserror::Error;
use uuid::Uuid;

/// Default timeout for one webhook POST.
const WEBHOOK_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("webhook client error: {0}")]
    Client(String),

    #[error("webhook request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("webhook {url} responded with status {status}")]
    Status { url: String, status: u16 },
}

/// Body posted to the webhook.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary<'a> {
    pub run_id: Uuid,
    pub workflow_id: Uuid,
    pub status: RunStatus,
    pub final_output: Option<&'a str>,
    pub failure_reason: Option<&'a str>,
    pub total_cost_usd: f64,
}

impl<'a> From<&'a WorkflowRun> for RunSummary<'a> {
    fn from(run: &'a WorkflowRun) -> Self {
        Self {
            run_id: run.id,
            workflow_id: run.workflow_id,
            status: run.status,
            final_output: run.final_output.as_deref(),
            failure_reason: run.failure_reason.as_deref(),
            total_cost_usd: run.total_cost_usd,
        }
    }
}

/// Posts run summaries to webhook URLs.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new() -> Result<Self, WebhookError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(WEBHOOK_TIMEOUT_SECS))
            .build()
            .map_err(|e| WebhookError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    /// POST the summary of `run` to `url`. Any non-2xx status is an error.
    pub async fn notify(&self, url: &str, run: &WorkflowRun) -> Result<(), WebhookError> {
        let summary = RunSummary::from(run);
        let response = self
            .client
            .post(url)
            .json(&summary)
            .send()
            .await
            .map_err(|e| WebhookError::Request {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(WebhookError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        tracing::debug!(run_id = %run.id, %url, "webhook delivered");
        Ok(())
    }
}
