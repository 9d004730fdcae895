use anyhow::Result;
use async_trait::async_trait;

use super::Database;
use crate::models::{Comment, CreateCommentInput};

/// Durable, authoritative storage for comments.
///
/// The service only talks to this trait, so any relational backend can sit
/// behind it. Every method is a single round trip.
#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn create(&self, input: CreateCommentInput) -> Result<Comment>;

    /// All comments of a task, ordered by id ascending.
    async fn get_by_task(&self, task_id: &str) -> Result<Vec<Comment>>;

    async fn get_by_id(&self, comment_id: i64) -> Result<Option<Comment>>;

    async fn update_content(&self, comment_id: i64, content: &str) -> Result<Option<Comment>>;

    /// `true` when a row existed and was removed.
    async fn delete_by_id(&self, comment_id: i64) -> Result<bool>;

    /// Number of rows removed; `0` means there was nothing to delete.
    async fn delete_by_task(&self, task_id: &str) -> Result<usize>;
}

#[async_trait]
impl CommentStore for Database {
    async fn create(&self, input: CreateCommentInput) -> Result<Comment> {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.create_comment(input)).await?
    }

    async fn get_by_task(&self, task_id: &str) -> Result<Vec<Comment>> {
        let db = self.clone();
        let task_id = task_id.to_string();
        tokio::task::spawn_blocking(move || db.get_comments_by_task(&task_id)).await?
    }

    async fn get_by_id(&self, comment_id: i64) -> Result<Option<Comment>> {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.get_comment(comment_id)).await?
    }

    async fn update_content(&self, comment_id: i64, content: &str) -> Result<Option<Comment>> {
        let db = self.clone();
        let content = content.to_string();
        tokio::task::spawn_blocking(move || db.update_comment_content(comment_id, &content)).await?
    }

    async fn delete_by_id(&self, comment_id: i64) -> Result<bool> {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.delete_comment(comment_id)).await?
    }

    async fn delete_by_task(&self, task_id: &str) -> Result<usize> {
        let db = self.clone();
        let task_id = task_id.to_string();
        tokio::task::spawn_blocking(move || db.delete_comments_by_task(&task_id)).await?
    }
}
