//! HTTP middleware

pub mod auth;
pub mod logging;
pub mod rate_limit;

pub use auth::{auth_middleware, worker_auth_middleware, AuthenticatedUser};
pub use logging::logging_middleware;
pub use rate_limit::submission_rate_limit_middleware;
