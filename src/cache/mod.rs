//! Per-task comment cache.
//!
//! Each task owns one bucket, addressed as `task:{task_id}:comments`, that maps
//! the stringified comment id to a JSON snapshot of the comment. The bucket
//! shares a single expiry which every write resets, so writing one comment
//! keeps its siblings alive too.
//!
//! A bucket that exists is expected to hold every comment of its task. Only
//! [`CommentCache::replace_bucket`] (fed from the store) and [`CommentCache::put`]
//! create buckets; write-through goes via [`CommentCache::put_if_present`],
//! which never creates a partial one.
//!
//! The cache is never authoritative. Callers treat every error from it as a
//! reason to fall back to the store.

mod memory_cache;
mod redis_cache;

pub use memory_cache::MemoryCommentCache;
pub use redis_cache::RedisCommentCache;

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Comment;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("failed to encode comment: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("cache call timed out")]
    Timeout,
}

/// Decoded content of one task bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CachedBucket {
    pub comments: BTreeMap<i64, Comment>,
    /// Entries that could not be decoded and were skipped.
    pub corrupted: usize,
}

impl CachedBucket {
    /// `true` when the bucket can be served as-is.
    pub fn is_usable(&self) -> bool {
        self.corrupted == 0 && !self.comments.is_empty()
    }
}

#[async_trait]
pub trait CommentCache: Send + Sync {
    /// Store a snapshot of `comment` and reset the bucket expiry.
    async fn put(&self, task_id: &str, comment: &Comment) -> Result<(), CacheError>;

    /// Like [`put`](Self::put), but only when the task bucket already exists.
    /// Returns whether the snapshot was written.
    async fn put_if_present(&self, task_id: &str, comment: &Comment) -> Result<bool, CacheError>;

    /// Atomically swap the bucket for exactly `comments`. An empty slice
    /// leaves no bucket behind.
    async fn replace_bucket(&self, task_id: &str, comments: &[Comment]) -> Result<(), CacheError>;

    /// `None` when the bucket does not exist at all.
    async fn get_all(&self, task_id: &str) -> Result<Option<CachedBucket>, CacheError>;

    async fn delete_one(&self, task_id: &str, comment_id: i64) -> Result<(), CacheError>;

    async fn delete_bucket(&self, task_id: &str) -> Result<(), CacheError>;
}

pub fn bucket_key(task_id: &str) -> String {
    format!("task:{task_id}:comments")
}

pub(crate) fn encode(comment: &Comment) -> Result<String, CacheError> {
    Ok(serde_json::to_string(comment)?)
}

/// Decode raw bucket fields, skipping anything that does not round back to a
/// comment of this task under its own id.
pub(crate) fn decode_bucket(
    task_id: &str,
    raw: impl IntoIterator<Item = (Vec<u8>, Vec<u8>)>,
) -> CachedBucket {
    let mut bucket = CachedBucket::default();

    for (field, value) in raw {
        match decode_entry(task_id, &field, &value) {
            Ok(comment) => {
                bucket.comments.insert(comment.id, comment);
            }
            Err(reason) => {
                let field = String::from_utf8_lossy(&field);
                tracing::warn!(task_id, field = %field, "Skipping corrupted cache entry: {}", reason);
                bucket.corrupted += 1;
            }
        }
    }

    bucket
}

fn decode_entry(task_id: &str, field: &[u8], value: &[u8]) -> Result<Comment, String> {
    let id: i64 = std::str::from_utf8(field)
        .ok()
        .and_then(|f| f.parse().ok())
        .ok_or_else(|| format!("field {:?} is not a comment id", String::from_utf8_lossy(field)))?;
    let comment: Comment = serde_json::from_slice(value).map_err(|e| e.to_string())?;

    if comment.id != id {
        return Err(format!("entry holds comment {} under field {}", comment.id, id));
    }
    if comment.task_id != task_id {
        return Err(format!("entry belongs to task {}", comment.task_id));
    }

    Ok(comment)
}
