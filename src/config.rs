//! Environment-driven configuration for the comment service.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("{0} must be set")]
    Missing(&'static str),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Address the HTTP server binds (from COMMENTS_HOST)
    pub host: String,
    /// Port for the HTTP server (from COMMENTS_PORT)
    pub port: u16,
    /// SQLite file path (from COMMENTS_DB_PATH); platform data dir when unset
    pub db_path: Option<PathBuf>,
    /// Redis connection URL (from REDIS_URL, or REDIS_HOST + REDIS_PORT)
    pub redis_url: Option<String>,
    /// Lifetime of a task's comment bucket (from REDIS_TIMEOUT, seconds)
    pub cache_ttl: Duration,
    /// Base URL of the task service used for ownership checks (from TASK_SERVICE_URL)
    pub task_service_url: Option<String>,
    /// Bound on upstream calls (from UPSTREAM_TIMEOUT_MS)
    pub upstream_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8001,
            db_path: None,
            redis_url: None,
            cache_ttl: Duration::from_secs(3600),
            task_service_url: None,
            upstream_timeout: Duration::from_millis(5000),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let redis_url = get("REDIS_URL").or_else(|| {
            let host = get("REDIS_HOST")?;
            let port = get("REDIS_PORT").unwrap_or_else(|| "6379".to_string());
            Some(format!("redis://{host}:{port}/0"))
        });

        Ok(Self {
            host: get("COMMENTS_HOST").unwrap_or(defaults.host),
            port: parse(&get, "COMMENTS_PORT")?.unwrap_or(defaults.port),
            db_path: get("COMMENTS_DB_PATH").map(PathBuf::from),
            redis_url,
            cache_ttl: parse::<u64>(&get, "REDIS_TIMEOUT")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
            task_service_url: get("TASK_SERVICE_URL"),
            upstream_timeout: parse::<u64>(&get, "UPSTREAM_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.upstream_timeout),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn require_task_service_url(&self) -> Result<&str, ConfigError> {
        self.task_service_url
            .as_deref()
            .ok_or(ConfigError::Missing("TASK_SERVICE_URL"))
    }
}

fn parse<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match get(key) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
