//! HTTP client for the comment API.
//!
//! This is what the chat bot (or any other front end) uses to reach the
//! comment service on behalf of one user. The token is forwarded as a bearer
//! credential; the service checks task ownership with it.

use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::models::*;

/// Failures reported by the comment API, matched once from the status code.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid comment service URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// Message suitable for showing to the end user.
    pub fn user_message(&self) -> &str {
        match self {
            Self::NotFound(detail)
            | Self::BadRequest(detail)
            | Self::Unauthorized(detail)
            | Self::RateLimited(detail) => detail.as_str(),
            Self::Unavailable(_) | Self::Http(_) | Self::InvalidUrl(_) => {
                "Сервис временно недоступен. Мы скоро вернёмся ;)"
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommentsClient {
    base_url: Url,
    token: Option<String>,
    client: Client,
}

impl CommentsClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            base_url,
            token,
            client: Client::new(),
        })
    }

    /// Base URL with each segment appended percent-encoded, so a task id
    /// holding `/` or `?` stays a single path segment.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> reqwest::RequestBuilder {
        let mut req = self.client.request(method, self.url(segments));
        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<DetailResponse>(&body)
            .map(|d| d.detail)
            .unwrap_or(body);

        Err(match status {
            StatusCode::NOT_FOUND => ClientError::NotFound(detail),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                ClientError::BadRequest(detail)
            }
            StatusCode::UNAUTHORIZED => ClientError::Unauthorized(detail),
            StatusCode::TOO_MANY_REQUESTS => ClientError::RateLimited(detail),
            _ => ClientError::Unavailable(format!("{}: {}", status, detail)),
        })
    }

    // ============================================================
    // Comment Operations
    // ============================================================

    pub async fn list_comments(&self, task_id: &str) -> Result<Vec<Comment>, ClientError> {
        let response = self
            .request(Method::GET, &["comments", task_id])
            .send()
            .await?;
        let body: CommentsResponse = self.handle_response(response).await?;
        Ok(body.comments)
    }

    pub async fn add_comment(
        &self,
        task_id: &str,
        user_id: i64,
        content: &str,
    ) -> Result<Comment, ClientError> {
        let input = CreateCommentInput {
            task_id: task_id.to_string(),
            user_id,
            content: content.to_string(),
        };
        let response = self
            .request(Method::POST, &["comments", task_id])
            .json(&input)
            .send()
            .await?;
        self.handle_response(response).await
    }

    pub async fn update_comment(
        &self,
        task_id: &str,
        comment_id: i64,
        content: &str,
    ) -> Result<Comment, ClientError> {
        let input = UpdateCommentInput {
            content: content.to_string(),
        };
        let response = self
            .request(Method::PUT, &["comments", task_id, &comment_id.to_string()])
            .json(&input)
            .send()
            .await?;
        self.handle_response(response).await
    }

    pub async fn delete_comment(
        &self,
        task_id: &str,
        comment_id: i64,
    ) -> Result<DetailResponse, ClientError> {
        let response = self
            .request(Method::DELETE, &["comments", task_id, &comment_id.to_string()])
            .send()
            .await?;
        self.handle_response(response).await
    }

    pub async fn delete_comments_by_task(&self, task_id: &str) -> Result<DetailResponse, ClientError> {
        let response = self
            .request(Method::DELETE, &["comments", task_id])
            .send()
            .await?;
        self.handle_response(response).await
    }
}
