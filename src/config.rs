//! Application configuration management
//!
//! This module handles loading and validating configuration from environment variables.
//! All configuration is loaded at startup and validated before the application runs.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    rate_limits, DEFAULT_BROKER_CONNECT_ATTEMPTS, DEFAULT_BROKER_MAX_DELAY_MS,
    DEFAULT_BROKER_MONITOR_INTERVAL_SECS, DEFAULT_BROKER_PUBLISH_TIMEOUT_MS,
    DEFAULT_BROKER_RETRY_DELAY_MS, DEFAULT_BROKER_URL, DEFAULT_CONSUMER_GROUP,
    DEFAULT_DATABASE_MAX_CONNECTIONS, DEFAULT_LOG_FILTER, DEFAULT_MAX_SOURCE_CODE_BYTES,
    DEFAULT_MEMORY_LIMIT_MB, DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT, DEFAULT_SUBMISSION_QUEUE,
    DEFAULT_TEST_QUEUE, DEFAULT_TIME_LIMIT_SECONDS,
};

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub broker: BrokerConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitConfig,
    pub submission: SubmissionConfig,
    pub worker: WorkerConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub rust_log: String,
    pub log_format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Job broker configuration
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub url: String,
    pub submission_queue: String,
    pub test_queue: String,
    pub consumer_group: String,
    pub connect_attempts: u32,
    pub backoff: BackoffKind,
    pub retry_delay: Duration,
    pub max_delay: Duration,
    pub publish_timeout: Duration,
    pub monitor_interval: Duration,
}

/// Delay policy between broker connection attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffKind {
    Fixed,
    Exponential,
}

/// Redis configuration (shared rate-limit counters)
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

/// JWT verification configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
}

/// Where rate-limit windows are counted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitBackend {
    /// Per-process counters
    Memory,
    /// Counters shared by every instance
    Redis,
}

/// Admission control configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub backend: RateLimitBackend,
    pub submission_limit: u64,
    pub submission_window: Duration,
    pub auth_failure_limit: u64,
    pub auth_failure_window: Duration,
}

/// Submission intake configuration
#[derive(Debug, Clone)]
pub struct SubmissionConfig {
    pub max_source_bytes: usize,
    /// Time limit in seconds when the problem has none
    pub default_time_limit: i32,
    /// Memory limit in megabytes when the problem has none
    pub default_memory_limit: i32,
}

/// Judging worker write-back configuration
#[derive(Debug, Clone, Default)]
pub struct WorkerConfig {
    /// Shared secret expected in `X-Worker-Token`; write-back is disabled when unset
    pub token: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            server: ServerConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            broker: BrokerConfig::from_env()?,
            redis: RedisConfig::from_env()?,
            jwt: JwtConfig::from_env()?,
            rate_limit: RateLimitConfig::from_env()?,
            submission: SubmissionConfig::from_env()?,
            worker: WorkerConfig::from_env(),
        })
    }
}

/// Read an optional variable, falling back to `default` and rejecting unparsable values
fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        Err(_) => Ok(default),
    }
}

fn string_var(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

impl ServerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let log_format = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("pretty") | Err(_) => LogFormat::Pretty,
            Ok(_) => return Err(ConfigError::InvalidValue("LOG_FORMAT".to_string())),
        };

        Ok(Self {
            host: string_var("SERVER_HOST", DEFAULT_SERVER_HOST),
            port: parse_var("SERVER_PORT", DEFAULT_SERVER_PORT)?,
            rust_log: string_var("RUST_LOG", DEFAULT_LOG_FILTER),
            log_format,
        })
    }
}

impl DatabaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Missing("DATABASE_URL".to_string()))?,
            max_connections: parse_var("DATABASE_MAX_CONNECTIONS", DEFAULT_DATABASE_MAX_CONNECTIONS)?,
        })
    }
}

impl BrokerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let backoff = match env::var("BROKER_BACKOFF").as_deref() {
            Ok("exponential") => BackoffKind::Exponential,
            Ok("fixed") | Err(_) => BackoffKind::Fixed,
            Ok(_) => return Err(ConfigError::InvalidValue("BROKER_BACKOFF".to_string())),
        };

        let connect_attempts = parse_var("BROKER_CONNECT_ATTEMPTS", DEFAULT_BROKER_CONNECT_ATTEMPTS)?;
        if connect_attempts == 0 {
            return Err(ConfigError::InvalidValue("BROKER_CONNECT_ATTEMPTS".to_string()));
        }

        Ok(Self {
            url: string_var("BROKER_URL", DEFAULT_BROKER_URL),
            submission_queue: string_var("SUBMISSION_QUEUE", DEFAULT_SUBMISSION_QUEUE),
            test_queue: string_var("TEST_QUEUE", DEFAULT_TEST_QUEUE),
            consumer_group: string_var("BROKER_CONSUMER_GROUP", DEFAULT_CONSUMER_GROUP),
            connect_attempts,
            backoff,
            retry_delay: Duration::from_millis(parse_var(
                "BROKER_RETRY_DELAY_MS",
                DEFAULT_BROKER_RETRY_DELAY_MS,
            )?),
            max_delay: Duration::from_millis(parse_var(
                "BROKER_MAX_DELAY_MS",
                DEFAULT_BROKER_MAX_DELAY_MS,
            )?),
            publish_timeout: Duration::from_millis(parse_var(
                "BROKER_PUBLISH_TIMEOUT_MS",
                DEFAULT_BROKER_PUBLISH_TIMEOUT_MS,
            )?),
            monitor_interval: Duration::from_secs(parse_var(
                "BROKER_MONITOR_INTERVAL_SECS",
                DEFAULT_BROKER_MONITOR_INTERVAL_SECS,
            )?),
        })
    }

    /// Every queue the producer publishes to
    pub fn queues(&self) -> Vec<String> {
        vec![self.submission_queue.clone(), self.test_queue.clone()]
    }
}

impl RedisConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: env::var("REDIS_URL")
                .or_else(|_| env::var("BROKER_URL"))
                .unwrap_or_else(|_| DEFAULT_BROKER_URL.to_string()),
        })
    }
}

impl JwtConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            secret: env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET".to_string()))?,
        })
    }
}

impl RateLimitConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let backend = match env::var("RATE_LIMIT_BACKEND").as_deref() {
            Ok("memory") => RateLimitBackend::Memory,
            Ok("redis") | Err(_) => RateLimitBackend::Redis,
            Ok(_) => return Err(ConfigError::InvalidValue("RATE_LIMIT_BACKEND".to_string())),
        };

        Ok(Self {
            backend,
            submission_limit: parse_var(
                "SUBMISSION_RATE_LIMIT",
                rate_limits::SUBMISSION_MAX_REQUESTS,
            )?,
            submission_window: Duration::from_secs(parse_var(
                "SUBMISSION_RATE_WINDOW_SECS",
                rate_limits::SUBMISSION_WINDOW_SECS,
            )?),
            auth_failure_limit: parse_var(
                "AUTH_FAILURE_LIMIT",
                rate_limits::AUTH_FAILURE_MAX_ATTEMPTS,
            )?,
            auth_failure_window: Duration::from_secs(parse_var(
                "AUTH_FAILURE_WINDOW_SECS",
                rate_limits::AUTH_FAILURE_WINDOW_SECS,
            )?),
        })
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            backend: RateLimitBackend::Memory,
            submission_limit: rate_limits::SUBMISSION_MAX_REQUESTS,
            submission_window: Duration::from_secs(rate_limits::SUBMISSION_WINDOW_SECS),
            auth_failure_limit: rate_limits::AUTH_FAILURE_MAX_ATTEMPTS,
            auth_failure_window: Duration::from_secs(rate_limits::AUTH_FAILURE_WINDOW_SECS),
        }
    }
}

impl SubmissionConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            max_source_bytes: parse_var("MAX_SOURCE_CODE_BYTES", DEFAULT_MAX_SOURCE_CODE_BYTES)?,
            default_time_limit: parse_var("DEFAULT_TIME_LIMIT_SECONDS", DEFAULT_TIME_LIMIT_SECONDS)?,
            default_memory_limit: parse_var("DEFAULT_MEMORY_LIMIT_MB", DEFAULT_MEMORY_LIMIT_MB)?,
        })
    }
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            max_source_bytes: DEFAULT_MAX_SOURCE_CODE_BYTES,
            default_time_limit: DEFAULT_TIME_LIMIT_SECONDS,
            default_memory_limit: DEFAULT_MEMORY_LIMIT_MB,
        }
    }
}

impl WorkerConfig {
    fn from_env() -> Self {
        Self {
            token: env::var("WORKER_TOKEN").ok().filter(|t| !t.is_empty()),
        }
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let limits = RateLimitConfig::default();
        assert_eq!(limits.submission_limit, 5);
        assert_eq!(limits.submission_window, Duration::from_secs(60));

        let submission = SubmissionConfig::default();
        assert_eq!(submission.max_source_bytes, 50_000);
        assert_eq!(submission.default_time_limit, 5);
        assert_eq!(submission.default_memory_limit, 256);
    }

    #[test]
    fn test_parse_var_falls_back_when_unset() {
        let value: u32 = parse_var("CODEJUDGE_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }
}
