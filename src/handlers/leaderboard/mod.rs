//! Leaderboard handlers

mod handler;
pub mod request;

pub use handler::*;
pub use request::*;

use axum::{routing::get, Router};

use crate::state::AppState;

/// Leaderboard routes; public
pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(handler::get_leaderboard))
}
