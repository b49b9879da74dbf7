//! Authentication middleware
//!
//! Tokens are issued by the account service; this gateway only verifies them.
//! Failed attempts are counted per claimed identity so that repeated bad
//! tokens are throttled by the auth-failure policy.

use axum::{
    body::Body,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::{
    constants::WORKER_TOKEN_HEADER,
    error::{AppError, AppResult},
    middleware::rate_limit::client_address,
    services::RateAction,
    state::AppState,
};

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub username: String,
    pub exp: i64,
    pub iat: i64,
}

/// Only the subject, read before the signature is trusted
#[derive(Debug, Deserialize)]
struct ClaimedSubject {
    sub: String,
}

/// Authenticated user extracted from JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub username: String,
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

/// Verify an HS256 token and return its claims
pub fn verify_token(token: &str, secret: &str) -> AppResult<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?;

    Ok(token_data.claims)
}

/// The `sub` a token claims, without checking its signature or expiry
fn claimed_subject(token: &str) -> Option<String> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    decode::<ClaimedSubject>(token, &DecodingKey::from_secret(&[]), &validation)
        .ok()
        .map(|data| data.claims.sub)
}

fn bearer_token(request: &Request<Body>) -> Option<String> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let path = request.uri().path().to_string();

    let Some(token) = bearer_token(&request) else {
        debug!(path = %path, "Auth failed: missing or malformed Authorization header");
        return Err(AppError::Unauthorized);
    };

    let identity = claimed_subject(&token).unwrap_or_else(|| client_address(&request));
    let limiter = state.rate_limiter();

    match limiter.allow(&identity, RateAction::AuthFailure).await {
        Ok(decision) if !decision.allowed => {
            warn!(path = %path, identity = %identity, "Too many failed authentication attempts");
            return Err(AppError::RateLimited {
                retry_after_secs: decision.reset_after.as_secs().max(1),
            });
        }
        Ok(_) => {}
        // Fail open on store errors
        Err(e) => error!(error = %e, "Auth failure limit check failed"),
    }

    let verified = verify_token(&token, &state.config().jwt.secret).and_then(|claims| {
        let id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;
        Ok(AuthenticatedUser {
            id,
            username: claims.username,
        })
    });

    let user = match verified {
        Ok(user) => user,
        Err(e) => {
            debug!(path = %path, identity = %identity, error = %e, "Auth failed: token rejected");
            if let Err(store_err) = limiter.record_failure(&identity).await {
                error!(error = %store_err, "Failed to record authentication failure");
            }
            return Err(e);
        }
    };

    debug!(path = %path, user_id = %user.id, "User authenticated");

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Authenticates judging workers by their shared secret.
///
/// Write-back stays closed until `WORKER_TOKEN` is configured.
pub async fn worker_auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.config().worker.token.as_deref() else {
        warn!("Worker write-back attempted but no worker token is configured");
        return Err(AppError::Unauthorized);
    };

    let authorized = request
        .headers()
        .get(WORKER_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|token| constant_time_eq(token.as_bytes(), expected.as_bytes()));

    if !authorized {
        warn!(path = %request.uri().path(), "Rejected worker request with bad token");
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(request).await)
}
