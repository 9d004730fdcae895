use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A comment left by a user on a task.
///
/// The `id` is assigned by the store and never reused. `task_id` and
/// `created_at` are fixed at creation; only `content` can change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    /// Opaque identifier of the parent task in the task service.
    pub task_id: String,
    /// The author.
    pub user_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /comments/{task_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCommentInput {
    /// Must match the task in the request path.
    pub task_id: String,
    pub user_id: i64,
    pub content: String,
}

/// Body of `PUT /comments/{task_id}/{comment_id}`.
///
/// Clients may send the full comment payload; only `content` is read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCommentInput {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentsResponse {
    pub comments: Vec<Comment>,
}

/// Plain acknowledgement body, also used for error payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailResponse {
    pub detail: String,
}

impl DetailResponse {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}
