//! Worker response DTOs

use serde::Serialize;
use uuid::Uuid;

use crate::models::{SubmissionStatus, TransitionOutcome};

/// Acknowledges a status write
#[derive(Debug, Serialize)]
pub struct JudgeAckResponse {
    pub submission_id: Uuid,
    pub status: SubmissionStatus,
    /// `false` when the write was a redelivery that changed nothing
    pub applied: bool,
}

impl From<TransitionOutcome> for JudgeAckResponse {
    fn from(outcome: TransitionOutcome) -> Self {
        let applied = matches!(outcome, TransitionOutcome::Applied(_));
        let submission = outcome.submission();
        Self {
            submission_id: submission.id,
            status: submission.status,
            applied,
        }
    }
}
