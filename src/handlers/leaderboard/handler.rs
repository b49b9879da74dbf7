//! Leaderboard handler implementations

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::{LeaderboardEntry, LeaderboardPeriod},
    state::AppState,
};

use super::request::LeaderboardQuery;

/// Ranked users for a period
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> AppResult<Json<Vec<LeaderboardEntry>>> {
    let period = match query.period.as_deref() {
        None => LeaderboardPeriod::default(),
        Some(raw) => raw
            .parse::<LeaderboardPeriod>()
            .map_err(|e| AppError::Validation(e.to_string()))?,
    };

    let entries = state.leaderboard().leaderboard(period).await?;
    Ok(Json(entries))
}
