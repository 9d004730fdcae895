//! Redis-backed comment cache.
//!
//! One Redis hash per task. Every write sets the field and resets the key
//! expiry in one atomic step, so a bucket is never left without an expiry.
//! Redis drops hashes that lose their last field, which makes "key absent"
//! the only empty signal.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use redis::{
    aio::{ConnectionManager, ConnectionManagerConfig},
    AsyncCommands, Client, Script,
};

use super::{bucket_key, decode_bucket, encode, CacheError, CachedBucket, CommentCache};
use crate::models::Comment;

/// HSET + EXPIRE, but only on a key that already exists.
const PUT_IF_PRESENT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
    redis.call('HSET', KEYS[1], ARGV[1], ARGV[2])
    redis.call('EXPIRE', KEYS[1], ARGV[3])
    return 1
end
return 0
"#;

#[derive(Clone)]
pub struct RedisCommentCache {
    connection: ConnectionManager,
    ttl: Duration,
}

impl RedisCommentCache {
    pub async fn connect(redis_url: &str, ttl: Duration) -> Result<Self, CacheError> {
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(1)
            .set_connection_timeout(Duration::from_millis(500));

        let client = Client::open(redis_url)?;
        let connection = client.get_connection_manager_with_config(config).await?;

        tracing::info!("Connected to Redis at {}", redis_url);
        Ok(Self { connection, ttl })
    }

    fn ttl_seconds(&self) -> i64 {
        self.ttl.as_secs().max(1) as i64
    }
}

#[async_trait]
impl CommentCache for RedisCommentCache {
    async fn put(&self, task_id: &str, comment: &Comment) -> Result<(), CacheError> {
        let key = bucket_key(task_id);
        let payload = encode(comment)?;
        let mut con = self.connection.clone();

        let _: () = redis::pipe()
            .atomic()
            .hset(&key, comment.id.to_string(), payload)
            .ignore()
            .expire(&key, self.ttl_seconds())
            .ignore()
            .query_async(&mut con)
            .await?;

        Ok(())
    }

    async fn put_if_present(&self, task_id: &str, comment: &Comment) -> Result<bool, CacheError> {
        let payload = encode(comment)?;
        let mut con = self.connection.clone();

        let written: i64 = Script::new(PUT_IF_PRESENT)
            .key(bucket_key(task_id))
            .arg(comment.id.to_string())
            .arg(payload)
            .arg(self.ttl_seconds())
            .invoke_async(&mut con)
            .await?;

        Ok(written == 1)
    }

    async fn replace_bucket(&self, task_id: &str, comments: &[Comment]) -> Result<(), CacheError> {
        let key = bucket_key(task_id);
        let fields = comments
            .iter()
            .map(|c| -> Result<(String, String), CacheError> {
                Ok((c.id.to_string(), encode(c)?))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut pipe = redis::pipe();
        pipe.atomic().del(&key).ignore();
        if !fields.is_empty() {
            pipe.hset_multiple(&key, &fields[..])
                .ignore()
                .expire(&key, self.ttl_seconds())
                .ignore();
        }

        let mut con = self.connection.clone();
        let _: () = pipe.query_async(&mut con).await?;
        Ok(())
    }

    async fn get_all(&self, task_id: &str) -> Result<Option<CachedBucket>, CacheError> {
        let mut con = self.connection.clone();
        // Raw bytes, so one undecodable value is skipped instead of failing the read.
        let raw: HashMap<Vec<u8>, Vec<u8>> = con.hgetall(bucket_key(task_id)).await?;

        if raw.is_empty() {
            return Ok(None);
        }

        Ok(Some(decode_bucket(task_id, raw)))
    }

    async fn delete_one(&self, task_id: &str, comment_id: i64) -> Result<(), CacheError> {
        let mut con = self.connection.clone();
        let _: () = con
            .hdel(bucket_key(task_id), comment_id.to_string())
            .await?;
        Ok(())
    }

    async fn delete_bucket(&self, task_id: &str) -> Result<(), CacheError> {
        let mut con = self.connection.clone();
        let _: () = con.del(bucket_key(task_id)).await?;
        Ok(())
    }
}
