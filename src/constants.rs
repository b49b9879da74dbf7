//! Application-wide constants
//!
//! This module contains all constant values used throughout the application.
//! Constants are grouped by their purpose for better organization.

// =============================================================================
// SERVER DEFAULTS
// =============================================================================

/// Default server host address
pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";

/// Default server port
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Default tracing filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "codejudge=info,tower_http=info";

// =============================================================================
// DATABASE DEFAULTS
// =============================================================================

/// Default maximum database connections in the pool
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 20;

// =============================================================================
// BROKER DEFAULTS
// =============================================================================

/// Default broker URL (Redis)
pub const DEFAULT_BROKER_URL: &str = "redis://localhost:6379";

/// Primary queue for graded submissions
pub const DEFAULT_SUBMISSION_QUEUE: &str = "submission_queue";

/// Secondary queue for test runs
pub const DEFAULT_TEST_QUEUE: &str = "test_queue";

/// Consumer group the judging workers read from
pub const DEFAULT_CONSUMER_GROUP: &str = "judge-workers";

/// Connection attempts before giving up
pub const DEFAULT_BROKER_CONNECT_ATTEMPTS: u32 = 5;

/// Delay between connection attempts in milliseconds
pub const DEFAULT_BROKER_RETRY_DELAY_MS: u64 = 5_000;

/// Upper bound on exponential backoff delays in milliseconds
pub const DEFAULT_BROKER_MAX_DELAY_MS: u64 = 60_000;

/// Timeout applied to a single publish in milliseconds
pub const DEFAULT_BROKER_PUBLISH_TIMEOUT_MS: u64 = 5_000;

/// Interval between broker liveness probes in seconds
pub const DEFAULT_BROKER_MONITOR_INTERVAL_SECS: u64 = 15;

/// Stream entry field that carries the serialized job
pub const JOB_PAYLOAD_FIELD: &str = "payload";

// =============================================================================
// SUBMISSION DEFAULTS
// =============================================================================

/// Maximum source code size in bytes
pub const DEFAULT_MAX_SOURCE_CODE_BYTES: usize = 50_000;

/// Time limit in seconds applied when a problem has none
pub const DEFAULT_TIME_LIMIT_SECONDS: i32 = 5;

/// Memory limit in megabytes applied when a problem has none
pub const DEFAULT_MEMORY_LIMIT_MB: i32 = 256;

/// Verdict written when a job could not be handed to the broker
pub const QUEUE_FAILURE_VERDICT: &str = "Submission could not be queued for judging";

/// Attempts at moving an unqueued submission to `Internal Error`
pub const COMPENSATION_ATTEMPTS: u32 = 3;

/// First delay between compensation attempts in milliseconds
pub const COMPENSATION_RETRY_DELAY_MS: u64 = 200;

/// Upper bound on compensation retry delays in milliseconds
pub const COMPENSATION_MAX_DELAY_MS: u64 = 2_000;

// =============================================================================
// SUPPORTED LANGUAGES
// =============================================================================

/// Language identifiers
pub mod languages {
    pub const CPP: &str = "cpp";
    pub const JAVA: &str = "java";
    pub const PYTHON: &str = "python";
    pub const JAVASCRIPT: &str = "javascript";

    /// All supported language identifiers
    pub const ALL: &[&str] = &[CPP, JAVA, PYTHON, JAVASCRIPT];
}

// =============================================================================
// RATE LIMITING
// =============================================================================

/// Rate limiting configuration
pub mod rate_limits {
    /// Submission creation - max requests per window
    pub const SUBMISSION_MAX_REQUESTS: u64 = 5;
    /// Submission creation - window in seconds
    pub const SUBMISSION_WINDOW_SECS: u64 = 60;

    /// Failed authentication attempts allowed per window
    pub const AUTH_FAILURE_MAX_ATTEMPTS: u64 = 10;
    /// Failed authentication window in seconds
    pub const AUTH_FAILURE_WINDOW_SECS: u64 = 900;
}

// =============================================================================
// PAGINATION
// =============================================================================

/// Default page size for paginated results
pub const DEFAULT_PAGE_SIZE: u32 = 20;

// =============================================================================
// LEADERBOARD
// =============================================================================

/// Number of ranked users returned
pub const LEADERBOARD_SIZE: usize = 100;

/// Points per solved problem by difficulty
pub mod scoring {
    pub const EASY_POINTS: u32 = 1;
    pub const MEDIUM_POINTS: u32 = 3;
    pub const HARD_POINTS: u32 = 5;
}

// =============================================================================
// API
// =============================================================================

/// API base path
pub const API_BASE_PATH: &str = "/api/v1";

/// Header carrying the worker's shared secret
pub const WORKER_TOKEN_HEADER: &str = "x-worker-token";

/// Largest accepted request body in bytes
pub const MAX_REQUEST_BODY_BYTES: usize = 512 * 1024;
