//! Task ownership checks against the upstream task service.
//!
//! Ownership is never cached: every mutating comment request asks the task
//! service whether the caller's credential can see the task.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
    #[error("credential rejected by the task service")]
    Unauthorized,

    #[error("task not found for this user")]
    NotFound,

    #[error("task service is rate limiting requests")]
    RateLimited,

    #[error("task service unavailable: {0}")]
    ServiceUnavailable(String),
}

#[async_trait]
pub trait OwnershipGuard: Send + Sync {
    /// `Ok(())` only when the credential's user owns the task.
    async fn check_ownership(&self, task_id: &str, credential: &str) -> Result<(), GuardError>;
}

/// Asks `GET {base_url}/tasks/{task_id}` with the caller's bearer token.
#[derive(Debug, Clone)]
pub struct HttpOwnershipGuard {
    base_url: Url,
    client: Client,
}

impl HttpOwnershipGuard {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Task service URL cannot be used as a base: {}", base_url);
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, client })
    }

    fn task_url(&self, task_id: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["tasks", task_id]);
        }
        url
    }
}

#[async_trait]
impl OwnershipGuard for HttpOwnershipGuard {
    async fn check_ownership(&self, task_id: &str, credential: &str) -> Result<(), GuardError> {
        let response = self
            .client
            .get(self.task_url(task_id))
            .bearer_auth(credential)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    tracing::warn!(task_id, "Ownership check timed out");
                    GuardError::ServiceUnavailable("request timed out".to_string())
                } else {
                    tracing::warn!(task_id, "Ownership check failed: {}", e);
                    GuardError::ServiceUnavailable(e.to_string())
                }
            })?;

        status_to_result(response.status())
    }
}

/// Map the task service's answer onto the guard outcome.
pub fn status_to_result(status: StatusCode) -> Result<(), GuardError> {
    match status {
        StatusCode::OK => Ok(()),
        StatusCode::UNAUTHORIZED => Err(GuardError::Unauthorized),
        StatusCode::NOT_FOUND => Err(GuardError::NotFound),
        StatusCode::TOO_MANY_REQUESTS => Err(GuardError::RateLimited),
        other => Err(GuardError::ServiceUnavailable(format!(
            "unexpected status {}",
            other
        ))),
    }
}
