//! Health check handlers

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use tracing::warn;

use crate::{db, state::AppState};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `UP` when every dependency is reachable, `DEGRADED` otherwise
    pub status: &'static str,
    pub version: &'static str,
    pub database: &'static str,
    pub broker: &'static str,
}

fn label(up: bool) -> &'static str {
    if up { "UP" } else { "DOWN" }
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database_up = match db::test_connection(state.db()).await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Health check: database unreachable");
            false
        }
    };
    let broker_up = state.publisher().is_connected();

    let healthy = database_up && broker_up;
    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(HealthResponse {
            status: if healthy { "UP" } else { "DEGRADED" },
            version: env!("CARGO_PKG_VERSION"),
            database: label(database_up),
            broker: label(broker_up),
        }),
    )
}

/// Health routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
