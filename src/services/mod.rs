//! Business logic services

pub mod leaderboard_service;
pub mod rate_limiter;
pub mod submission_service;

pub use leaderboard_service::LeaderboardService;
pub use rate_limiter::{
    MemoryRateLimitStore, RateAction, RateDecision, RateLimitStore, RateLimiter,
    RedisRateLimitStore,
};
pub use submission_service::{JobQueues, SubmissionInput, SubmissionService};
