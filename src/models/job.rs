//! Judge job: the wire-only message handed to the worker

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Language, ProblemLimits, Submission};

/// A judge job message sent to the worker queue.
///
/// Jobs are never persisted by this service; the queue entry is their only copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub submission_id: Uuid,
    pub problem_id: Uuid,
    pub source_code: String,
    pub language: Language,
    /// Time limit in seconds
    pub time_limit: i32,
    /// Memory limit in megabytes
    pub memory_limit: i32,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_test: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Job {
    /// Build the job for a freshly created submission
    pub fn for_submission(
        submission: &Submission,
        limits: &ProblemLimits,
        default_time_limit: i32,
        default_memory_limit: i32,
    ) -> Self {
        Self {
            submission_id: submission.id,
            problem_id: submission.problem_id,
            source_code: submission.source_code.clone(),
            language: submission.language,
            time_limit: limits.time_limit_or(default_time_limit),
            memory_limit: limits.memory_limit_or(default_memory_limit),
            is_test: submission.is_test_run,
        }
    }
}
