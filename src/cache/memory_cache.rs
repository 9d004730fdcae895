use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::{bucket_key, decode_bucket, encode, CacheError, CachedBucket, CommentCache};
use crate::models::Comment;

struct Bucket {
    entries: HashMap<String, Vec<u8>>,
    expires_at: Instant,
}

impl Bucket {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-process cache with the same bucket semantics as the Redis adapter.
///
/// Entries are kept as raw JSON bytes so that decoding behaves exactly like
/// the Redis path. Used when no Redis is configured and in tests.
#[derive(Clone)]
pub struct MemoryCommentCache {
    buckets: Arc<DashMap<String, Bucket>>,
    ttl: Duration,
}

impl MemoryCommentCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            buckets: Arc::new(DashMap::new()),
            ttl,
        }
    }

    pub fn with_default_settings() -> Self {
        Self::new(Duration::from_secs(3600))
    }

    /// Write a raw field into a task bucket without encoding it.
    pub fn insert_raw(&self, task_id: &str, field: &str, value: impl AsRef<[u8]>) {
        self.write(task_id, field.to_string(), value.as_ref().to_vec());
    }

    /// Whether a bucket currently exists for the task.
    pub fn contains_bucket(&self, task_id: &str) -> bool {
        let now = Instant::now();
        self.buckets
            .get(&bucket_key(task_id))
            .is_some_and(|b| !b.is_expired(now) && !b.entries.is_empty())
    }

    fn write(&self, task_id: &str, field: String, value: Vec<u8>) {
        let now = Instant::now();
        let mut bucket = self
            .buckets
            .entry(bucket_key(task_id))
            .or_insert_with(|| Bucket {
                entries: HashMap::new(),
                expires_at: now,
            });

        if bucket.is_expired(now) {
            bucket.entries.clear();
        }
        bucket.entries.insert(field, value);
        bucket.expires_at = now + self.ttl;
    }
}

#[async_trait]
impl CommentCache for MemoryCommentCache {
    async fn put(&self, task_id: &str, comment: &Comment) -> Result<(), CacheError> {
        let payload = encode(comment)?;
        self.write(task_id, comment.id.to_string(), payload.into_bytes());
        Ok(())
    }

    async fn put_if_present(&self, task_id: &str, comment: &Comment) -> Result<bool, CacheError> {
        let payload = encode(comment)?;
        let key = bucket_key(task_id);
        let now = Instant::now();

        let written = match self.buckets.get_mut(&key) {
            Some(mut bucket) if !bucket.is_expired(now) && !bucket.entries.is_empty() => {
                bucket.entries.insert(comment.id.to_string(), payload.into_bytes());
                bucket.expires_at = now + self.ttl;
                true
            }
            _ => false,
        };

        if !written {
            self.buckets
                .remove_if(&key, |_, b| b.is_expired(now) || b.entries.is_empty());
        }
        Ok(written)
    }

    async fn replace_bucket(&self, task_id: &str, comments: &[Comment]) -> Result<(), CacheError> {
        let key = bucket_key(task_id);
        if comments.is_empty() {
            self.buckets.remove(&key);
            return Ok(());
        }

        let entries = comments
            .iter()
            .map(|c| -> Result<(String, Vec<u8>), CacheError> {
                Ok((c.id.to_string(), encode(c)?.into_bytes()))
            })
            .collect::<Result<HashMap<_, _>, _>>()?;

        self.buckets.insert(
            key,
            Bucket {
                entries,
                expires_at: Instant::now() + self.ttl,
            },
        );
        Ok(())
    }

    async fn get_all(&self, task_id: &str) -> Result<Option<CachedBucket>, CacheError> {
        let key = bucket_key(task_id);
        let now = Instant::now();

        let live = {
            let Some(bucket) = self.buckets.get(&key) else {
                return Ok(None);
            };
            if bucket.is_expired(now) || bucket.entries.is_empty() {
                None
            } else {
                Some(bucket.entries.clone())
            }
        };

        match live {
            Some(raw) => Ok(Some(decode_bucket(
                task_id,
                raw.into_iter().map(|(field, value)| (field.into_bytes(), value)),
            ))),
            None => {
                // The shard guard above must be released before removing.
                self.buckets
                    .remove_if(&key, |_, b| b.is_expired(now) || b.entries.is_empty());
                Ok(None)
            }
        }
    }

    async fn delete_one(&self, task_id: &str, comment_id: i64) -> Result<(), CacheError> {
        let key = bucket_key(task_id);
        if let Some(mut bucket) = self.buckets.get_mut(&key) {
            bucket.entries.remove(&comment_id.to_string());
        }
        self.buckets.remove_if(&key, |_, b| b.entries.is_empty());
        Ok(())
    }

    async fn delete_bucket(&self, task_id: &str) -> Result<(), CacheError> {
        self.buckets.remove(&bucket_key(task_id));
        Ok(())
    }
}
