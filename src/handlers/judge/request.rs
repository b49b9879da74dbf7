//! Worker request DTOs

use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{JudgeReport, SubmissionStatus},
};

/// Final result reported by a worker
#[derive(Debug, Deserialize, Validate)]
pub struct JudgeResultRequest {
    /// Terminal status label, e.g. `Accepted`
    pub status: String,

    #[serde(default)]
    #[validate(length(max = 10000))]
    pub verdict: String,

    #[validate(range(min = 0))]
    pub execution_time: Option<i32>,

    #[validate(range(min = 0))]
    pub memory_used: Option<i32>,

    #[validate(range(min = 0))]
    pub test_cases_passed: Option<i32>,

    #[validate(range(min = 0))]
    pub total_test_cases: Option<i32>,

    pub judged_at: Option<DateTime<Utc>>,
}

impl JudgeResultRequest {
    pub fn into_report(self) -> AppResult<JudgeReport> {
        let status = self
            .status
            .parse::<SubmissionStatus>()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        Ok(JudgeReport {
            status,
            verdict: self.verdict,
            execution_time: self.execution_time,
            memory_used: self.memory_used,
            test_cases_passed: self.test_cases_passed,
            total_test_cases: self.total_test_cases,
            judged_at: self.judged_at,
        })
    }
}
