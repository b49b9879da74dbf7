//! Rate limiting middleware

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use crate::{
    error::AppError,
    middleware::auth::AuthenticatedUser,
    services::{RateAction, RateDecision},
    state::AppState,
};

/// Peer address, or the first `X-Forwarded-For` hop behind a proxy
pub fn client_address(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .or_else(|| {
            request
                .headers()
                .get("X-Forwarded-For")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.split(',').next())
                .map(|s| s.trim().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Authenticated user id, falling back to the client address
fn client_identity(request: &Request) -> String {
    match request.extensions().get::<AuthenticatedUser>() {
        Some(user) => user.id.to_string(),
        None => client_address(request),
    }
}

/// Add rate limit headers to response
fn add_rate_limit_headers(response: &mut Response, decision: &RateDecision) {
    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", HeaderValue::from(decision.limit));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(decision.remaining));
    headers.insert(
        "X-RateLimit-Reset",
        HeaderValue::from(decision.reset_after.as_secs()),
    );
}

/// Rate limiting middleware for submissions and test runs.
///
/// Must run after authentication so the limit follows the user.
pub async fn submission_rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let identity = client_identity(&request);

    match state
        .rate_limiter()
        .allow(&identity, RateAction::Submission)
        .await
    {
        Ok(decision) if !decision.allowed => {
            warn!(identity = %identity, "Submission rate limit exceeded");
            let mut response = AppError::RateLimited {
                retry_after_secs: decision.reset_after.as_secs().max(1),
            }
            .into_response();
            add_rate_limit_headers(&mut response, &decision);
            response
        }
        Ok(decision) => {
            let mut response = next.run(request).await;
            add_rate_limit_headers(&mut response, &decision);
            response
        }
        Err(e) => {
            error!(error = %e, "Rate limit check failed");
            next.run(request).await
        }
    }
}
