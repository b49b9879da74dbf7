//! Worker write-back handlers
//!
//! Judging workers report progress and results here. These routes are not
//! for end users and are guarded by the worker token.

mod handler;
pub mod request;
pub mod response;

pub use handler::*;
pub use request::*;
pub use response::*;

use axum::{middleware, routing::post, Router};

use crate::{middleware::worker_auth_middleware, state::AppState};

/// Worker routes
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/{id}/judging", post(handler::mark_judging))
        .route("/{id}/result", post(handler::record_result))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            worker_auth_middleware,
        ))
}
