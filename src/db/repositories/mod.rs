//! Database repositories
//!
//! Repositories handle all direct database interactions. Services depend on
//! the store traits below so they can run against in-memory doubles in tests.

pub mod problem_repo;
pub mod submission_repo;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    AcceptedSolve, JudgeReport, NewSubmission, ProblemLimits, Submission, SubmissionFilter,
    SubmissionTotals, TransitionOutcome,
};

pub use problem_repo::PgProblemStore;
pub use submission_repo::PgSubmissionStore;

/// Owner of the submission record and its lifecycle
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Insert a `Pending` submission
    async fn create(&self, new: NewSubmission) -> AppResult<Submission>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Submission>>;

    /// Newest first, with the total number of matching rows
    async fn list_by_user(
        &self,
        user_id: Uuid,
        filter: SubmissionFilter,
    ) -> AppResult<(Vec<Submission>, i64)>;

    /// Compensate a failed enqueue: `Pending -> Internal Error`.
    ///
    /// Returns `false` when the record had already left `Pending`.
    async fn mark_internal_error(&self, id: Uuid, verdict: &str) -> AppResult<bool>;

    /// `Pending -> Judging`
    async fn mark_judging(&self, id: Uuid) -> AppResult<TransitionOutcome>;

    /// Store the worker's terminal result
    async fn record_verdict(&self, id: Uuid, report: &JudgeReport) -> AppResult<TransitionOutcome>;

    /// Distinct accepted (user, problem) pairs since `since`, test runs excluded
    async fn accepted_solves(&self, since: Option<DateTime<Utc>>) -> AppResult<Vec<AcceptedSolve>>;

    /// Lifetime graded submission counts for `user_ids`, test runs excluded
    async fn submission_totals(&self, user_ids: &[Uuid]) -> AppResult<Vec<SubmissionTotals>>;
}

/// Read access to problem metadata
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProblemStore: Send + Sync {
    async fn find_limits(&self, id: Uuid) -> AppResult<Option<ProblemLimits>>;
}
