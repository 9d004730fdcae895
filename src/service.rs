//! Comment orchestration between the store and the cache.
//!
//! Every mutating path writes the store first and the cache second, so the
//! cache can lag behind the store but never run ahead of it. Writes only touch
//! a bucket that already exists; a missing bucket is left for the next read,
//! which rebuilds it from the full store listing. Store and guard failures
//! reach the caller; cache failures are logged and dropped.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheError, CommentCache};
use crate::db::CommentStore;
use crate::error::CommentError;
use crate::guard::{GuardError, OwnershipGuard};
use crate::models::{Comment, CreateCommentInput};

/// Default bound on every store, cache and guard call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct CommentService {
    store: Arc<dyn CommentStore>,
    cache: Arc<dyn CommentCache>,
    guard: Arc<dyn OwnershipGuard>,
    call_timeout: Duration,
}

impl CommentService {
    pub fn new(
        store: Arc<dyn CommentStore>,
        cache: Arc<dyn CommentCache>,
        guard: Arc<dyn OwnershipGuard>,
    ) -> Self {
        Self {
            store,
            cache,
            guard,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    // ============================================================
    // Operations
    // ============================================================

    pub async fn create_comment(
        &self,
        task_id: &str,
        credential: &str,
        input: CreateCommentInput,
    ) -> Result<Comment, CommentError> {
        if task_id.trim().is_empty() {
            return Err(CommentError::ConstraintViolation(
                "Не указан id задачи".to_string(),
            ));
        }
        if input.task_id != task_id {
            return Err(CommentError::ConstraintViolation(
                "id задачи в теле запроса не совпадает с адресом".to_string(),
            ));
        }
        validate_content(&input.content)?;

        self.authorize(task_id, credential).await?;

        let comment = self.stored(self.store.create(input)).await?;
        tracing::info!(task_id, comment_id = comment.id, "Comment created");

        self.refresh_cached(&comment).await;
        Ok(comment)
    }

    /// All comments of a task ordered by id ascending.
    ///
    /// Not gated by the ownership guard: any caller can read any task's
    /// comments.
    pub async fn list_comments(&self, task_id: &str) -> Result<Vec<Comment>, CommentError> {
        match self.cached(self.cache.get_all(task_id)).await {
            Ok(Some(bucket)) if bucket.is_usable() => {
                tracing::debug!(task_id, "Comment cache hit");
                return Ok(bucket.comments.into_values().collect());
            }
            Ok(Some(bucket)) if bucket.corrupted > 0 => {
                tracing::warn!(
                    task_id,
                    corrupted = bucket.corrupted,
                    "Dropping comment bucket with corrupted entries"
                );
                if let Err(e) = self.cached(self.cache.delete_bucket(task_id)).await {
                    tracing::warn!(task_id, "Failed to drop corrupted bucket: {}", e);
                }
            }
            Ok(_) => tracing::debug!(task_id, "Comment cache miss"),
            Err(e) => tracing::warn!(task_id, "Comment cache read failed, using store: {}", e),
        }

        let comments = self.stored(self.store.get_by_task(task_id)).await?;

        if !comments.is_empty() {
            if let Err(e) = self.cached(self.cache.replace_bucket(task_id, &comments)).await {
                tracing::warn!(task_id, "Failed to repopulate comment cache: {}", e);
            }
        }

        Ok(comments)
    }

    /// Replace the content of a comment that belongs to `task_id`.
    pub async fn update_comment(
        &self,
        task_id: &str,
        comment_id: i64,
        credential: &str,
        content: &str,
    ) -> Result<Comment, CommentError> {
        validate_content(content)?;
        self.authorize(task_id, credential).await?;

        if !self.belongs_to_task(task_id, comment_id).await? {
            return Err(CommentError::NotFound);
        }

        let comment = self
            .stored(self.store.update_content(comment_id, content))
            .await?
            .ok_or(CommentError::NotFound)?;
        tracing::info!(task_id, comment_id, "Comment updated");

        self.refresh_cached(&comment).await;
        Ok(comment)
    }

    /// `Ok(false)` when the task has no comment with this id.
    pub async fn delete_comment(
        &self,
        task_id: &str,
        comment_id: i64,
        credential: &str,
    ) -> Result<bool, CommentError> {
        self.authorize(task_id, credential).await?;

        if !self.belongs_to_task(task_id, comment_id).await? {
            return Ok(false);
        }

        if !self.stored(self.store.delete_by_id(comment_id)).await? {
            return Ok(false);
        }
        tracing::info!(task_id, comment_id, "Comment deleted");

        if let Err(e) = self.cached(self.cache.delete_one(task_id, comment_id)).await {
            tracing::warn!(task_id, comment_id, "Failed to evict cached comment: {}", e);
            self.invalidate(task_id).await;
        }
        Ok(true)
    }

    /// Delete every comment of a task and return how many were removed.
    ///
    /// The cache bucket is dropped even when nothing was deleted, which clears
    /// buckets orphaned by an earlier partial failure.
    pub async fn delete_comments_by_task(
        &self,
        task_id: &str,
        credential: &str,
    ) -> Result<usize, CommentError> {
        self.authorize(task_id, credential).await?;

        let count = self.stored(self.store.delete_by_task(task_id)).await?;
        tracing::info!(task_id, count, "Task comments deleted");

        if let Err(e) = self.cached(self.cache.delete_bucket(task_id)).await {
            tracing::warn!(task_id, "Failed to drop comment bucket: {}", e);
        }
        Ok(count)
    }

    // ============================================================
    // Helpers
    // ============================================================

    async fn authorize(&self, task_id: &str, credential: &str) -> Result<(), CommentError> {
        match tokio::time::timeout(
            self.call_timeout,
            self.guard.check_ownership(task_id, credential),
        )
        .await
        {
            Ok(result) => result.map_err(CommentError::from),
            Err(_) => Err(GuardError::ServiceUnavailable("ownership check timed out".to_string()).into()),
        }
    }

    async fn belongs_to_task(&self, task_id: &str, comment_id: i64) -> Result<bool, CommentError> {
        let existing = self.stored(self.store.get_by_id(comment_id)).await?;
        Ok(existing.is_some_and(|c| c.task_id == task_id))
    }

    /// Overwrite the cached snapshot after a successful store write, if the
    /// task bucket is cached at all.
    async fn refresh_cached(&self, comment: &Comment) {
        match self
            .cached(self.cache.put_if_present(&comment.task_id, comment))
            .await
        {
            Ok(true) => {}
            Ok(false) => tracing::debug!(
                task_id = %comment.task_id,
                "No cached bucket to refresh"
            ),
            Err(e) => {
                tracing::warn!(
                    task_id = %comment.task_id,
                    comment_id = comment.id,
                    "Cache write failed after store commit: {}",
                    e
                );
                self.invalidate(&comment.task_id).await;
            }
        }
    }

    /// Best-effort drop of a bucket that may now hold a stale snapshot.
    async fn invalidate(&self, task_id: &str) {
        if let Err(e) = self.cached(self.cache.delete_bucket(task_id)).await {
            tracing::warn!(task_id, "Failed to drop stale comment bucket: {}", e);
        }
    }

    async fn stored<T>(
        &self,
        call: impl Future<Output = anyhow::Result<T>>,
    ) -> Result<T, CommentError> {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result.map_err(CommentError::from),
            Err(_) => Err(CommentError::StoreTimeout),
        }
    }

    async fn cached<T>(&self, call: impl Future<Output = Result<T, CacheError>>) -> Result<T, CacheError> {
        tokio::time::timeout(self.call_timeout, call)
            .await
            .unwrap_or(Err(CacheError::Timeout))
    }
}

fn validate_content(content: &str) -> Result<(), CommentError> {
    if content.trim().is_empty() {
        return Err(CommentError::ConstraintViolation(
            "Комментарий не может быть пустым".to_string(),
        ));
    }
    Ok(())
}
