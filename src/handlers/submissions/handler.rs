//! Submission handler implementations

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    constants::DEFAULT_PAGE_SIZE,
    error::{AppError, AppResult},
    middleware::auth::AuthenticatedUser,
    models::SubmissionStatus,
    services::SubmissionInput,
    state::AppState,
};

use super::{
    request::{CreateSubmissionRequest, ListSubmissionsQuery},
    response::{CreateSubmissionResponse, SubmissionStatusResponse, SubmissionsListResponse},
};

fn into_input(user: &AuthenticatedUser, payload: CreateSubmissionRequest) -> SubmissionInput {
    SubmissionInput {
        user_id: user.id,
        problem_id: payload.problem_id,
        language: payload.language,
        source_code: payload.source_code,
    }
}

/// Create a new submission
pub async fn create_submission(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Json(payload): Json<CreateSubmissionRequest>,
) -> AppResult<(StatusCode, Json<CreateSubmissionResponse>)> {
    payload.validate()?;

    let submission = state
        .submissions()
        .submit(into_input(&auth_user, payload))
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(CreateSubmissionResponse {
            submission_id: submission.id,
            status: submission.status,
            message: "Submission received and queued for judging".to_string(),
        }),
    ))
}

/// Run code against the sample tests without recording a graded attempt
pub async fn create_test_run(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Json(payload): Json<CreateSubmissionRequest>,
) -> AppResult<(StatusCode, Json<CreateSubmissionResponse>)> {
    payload.validate()?;

    let submission = state
        .submissions()
        .test_run(into_input(&auth_user, payload))
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(CreateSubmissionResponse {
            submission_id: submission.id,
            status: submission.status,
            message: "Test run received and queued".to_string(),
        }),
    ))
}

/// List the caller's submissions
pub async fn list_my_submissions(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Query(query): Query<ListSubmissionsQuery>,
) -> AppResult<Json<SubmissionsListResponse>> {
    query.validate()?;

    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let status = query
        .status
        .as_deref()
        .map(str::parse::<SubmissionStatus>)
        .transpose()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let (submissions, total) = state
        .submissions()
        .list_for_user(auth_user.id, page, limit, status)
        .await?;

    let limit_i64 = i64::from(limit);
    Ok(Json(SubmissionsListResponse {
        submissions: submissions.into_iter().map(Into::into).collect(),
        total,
        page,
        limit,
        total_pages: (total + limit_i64 - 1) / limit_i64,
    }))
}

/// Poll the status of a submission
pub async fn get_submission(
    State(state): State<AppState>,
    _auth_user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SubmissionStatusResponse>> {
    let submission = state.submissions().get_status(id).await?;
    Ok(Json(submission.into()))
}
