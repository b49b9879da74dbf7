//! Worker handler implementations

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{error::AppResult, state::AppState};

use super::{request::JudgeResultRequest, response::JudgeAckResponse};

/// A worker picked the job up
pub async fn mark_judging(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<JudgeAckResponse>> {
    let outcome = state.submissions().mark_judging(id).await?;
    Ok(Json(outcome.into()))
}

/// A worker finished judging
pub async fn record_result(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<JudgeResultRequest>,
) -> AppResult<Json<JudgeAckResponse>> {
    payload.validate()?;

    let outcome = state
        .submissions()
        .record_judge_result(id, payload.into_report()?)
        .await?;
    Ok(Json(outcome.into()))
}
