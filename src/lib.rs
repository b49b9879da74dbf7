//! CodeJudge - Submission Gateway
//!
//! This library provides the producer side of an online judge: it accepts
//! source code against a problem, hands a durable job to the judging workers
//! and lets clients poll the verdict.
//!
//! # Features
//!
//! - Write-then-enqueue with compensation when the broker refuses the job
//! - Redis Streams job queue with bounded, pluggable reconnection backoff
//! - Per-identity rate limiting of submissions and failed authentication
//! - Leaderboards over all time, the last month or the last week
//!
//! # Architecture
//!
//! The application follows a layered architecture:
//! - **Handlers**: HTTP request handlers (thin layer)
//! - **Services**: Business logic
//! - **Queue**: Broker connection lifecycle and publishing
//! - **Repositories**: Database access
//! - **Models**: Domain models and DTOs

pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod queue;
pub mod services;
pub mod state;
pub mod utils;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::AppState;
