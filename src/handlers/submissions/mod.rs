//! Submission handlers

mod handler;
pub mod request;
pub mod response;

pub use handler::*;
pub use request::*;
pub use response::*;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{
    middleware::{auth_middleware, submission_rate_limit_middleware},
    state::AppState,
};

/// Submission routes.
///
/// Intake is rate limited per user, so authentication wraps the limiter.
pub fn routes(state: &AppState) -> Router<AppState> {
    let intake = Router::new()
        .route("/", post(handler::create_submission))
        .route("/test", post(handler::create_test_run))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            submission_rate_limit_middleware,
        ));

    Router::new()
        .route("/my-submissions", get(handler::list_my_submissions))
        .route("/{id}", get(handler::get_submission))
        .merge(intake)
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}
