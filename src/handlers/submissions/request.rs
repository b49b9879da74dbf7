//! Submission request DTOs

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Create submission request, shared by graded submissions and test runs
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubmissionRequest {
    /// Problem ID to submit for
    pub problem_id: Uuid,

    /// Programming language
    #[validate(length(min = 1, max = 20))]
    pub language: String,

    /// Source code; its byte limit is configurable and checked by the service
    pub source_code: String,
}

/// List submissions query parameters
#[derive(Debug, Deserialize, Validate)]
pub struct ListSubmissionsQuery {
    #[validate(range(min = 1))]
    pub page: Option<u32>,

    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u32>,

    /// Status label, e.g. `Wrong Answer`
    pub status: Option<String>,
}
