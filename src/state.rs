//! Application state management
//!
//! This module contains the shared application state that is passed
//! to all request handlers via Axum's State extractor.

use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    config::Config,
    queue::JobPublisher,
    services::{LeaderboardService, RateLimiter, SubmissionService},
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

/// Inner state (wrapped in Arc for cheap cloning)
struct AppStateInner {
    /// Database connection pool
    db: PgPool,

    /// Application configuration
    config: Config,

    submissions: SubmissionService,

    leaderboard: LeaderboardService,

    rate_limiter: RateLimiter,

    /// Job queue, also probed by the health check
    publisher: Arc<dyn JobPublisher>,
}

impl AppState {
    /// Create a new application state
    pub fn new(
        db: PgPool,
        config: Config,
        submissions: SubmissionService,
        leaderboard: LeaderboardService,
        rate_limiter: RateLimiter,
        publisher: Arc<dyn JobPublisher>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                db,
                config,
                submissions,
                leaderboard,
                rate_limiter,
                publisher,
            }),
        }
    }

    /// Get a reference to the database pool
    pub fn db(&self) -> &PgPool {
        &self.inner.db
    }

    /// Get a reference to the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn submissions(&self) -> &SubmissionService {
        &self.inner.submissions
    }

    pub fn leaderboard(&self) -> &LeaderboardService {
        &self.inner.leaderboard
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.inner.rate_limiter
    }

    pub fn publisher(&self) -> &dyn JobPublisher {
        self.inner.publisher.as_ref()
    }
}
