//! Submission response DTOs

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Language, Submission, SubmissionStatus};

/// Returned once a submission has been handed to the judging queue
#[derive(Debug, Serialize)]
pub struct CreateSubmissionResponse {
    pub submission_id: Uuid,
    pub status: SubmissionStatus,
    pub message: String,
}

/// Status projection polled by clients
#[derive(Debug, Serialize)]
pub struct SubmissionStatusResponse {
    pub submission_id: Uuid,
    pub problem_id: Uuid,
    pub language: Language,
    pub status: SubmissionStatus,
    pub verdict: String,
    /// Milliseconds
    pub execution_time: Option<i32>,
    /// Kilobytes
    pub memory_used: Option<i32>,
    pub test_cases_passed: Option<i32>,
    pub total_test_cases: Option<i32>,
    pub judged_at: Option<DateTime<Utc>>,
    pub is_test_run: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Submission> for SubmissionStatusResponse {
    fn from(s: Submission) -> Self {
        Self {
            submission_id: s.id,
            problem_id: s.problem_id,
            language: s.language,
            status: s.status,
            verdict: s.verdict,
            execution_time: s.execution_time,
            memory_used: s.memory_used,
            test_cases_passed: s.test_cases_passed,
            total_test_cases: s.total_test_cases,
            judged_at: s.judged_at,
            is_test_run: s.is_test_run,
            created_at: s.created_at,
        }
    }
}

/// Submission list response
#[derive(Debug, Serialize)]
pub struct SubmissionsListResponse {
    pub submissions: Vec<SubmissionStatusResponse>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: i64,
}
