//! Submission service
//!
//! Coordinates the create-then-enqueue two-step. The record is written first;
//! if handing the job to the broker then fails, the record is moved to
//! `Internal Error` so that it never stays `Pending` for a job nobody holds.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    config::{BrokerConfig, SubmissionConfig},
    constants::{
        COMPENSATION_ATTEMPTS, COMPENSATION_MAX_DELAY_MS, COMPENSATION_RETRY_DELAY_MS,
        QUEUE_FAILURE_VERDICT,
    },
    db::repositories::{ProblemStore, SubmissionStore},
    error::{AppError, AppResult},
    models::{
        Job, JudgeReport, NewSubmission, Submission, SubmissionFilter, SubmissionStatus,
        TransitionOutcome,
    },
    queue::{BackoffStrategy, ExponentialBackoff, JobPublisher},
    utils::{validate_language, validate_source_code},
};

/// Queue names jobs are routed to
#[derive(Debug, Clone)]
pub struct JobQueues {
    /// Graded submissions
    pub graded: String,
    /// Test runs
    pub test: String,
}

impl From<&BrokerConfig> for JobQueues {
    fn from(config: &BrokerConfig) -> Self {
        Self {
            graded: config.submission_queue.clone(),
            test: config.test_queue.clone(),
        }
    }
}

/// Code submitted by a user
#[derive(Debug, Clone)]
pub struct SubmissionInput {
    pub user_id: Uuid,
    pub problem_id: Uuid,
    pub language: String,
    pub source_code: String,
}

/// Submission service for business logic
pub struct SubmissionService {
    submissions: Arc<dyn SubmissionStore>,
    problems: Arc<dyn ProblemStore>,
    publisher: Arc<dyn JobPublisher>,
    config: SubmissionConfig,
    queues: JobQueues,
    compensation_backoff: Box<dyn BackoffStrategy>,
}

impl SubmissionService {
    pub fn new(
        submissions: Arc<dyn SubmissionStore>,
        problems: Arc<dyn ProblemStore>,
        publisher: Arc<dyn JobPublisher>,
        config: SubmissionConfig,
        queues: JobQueues,
    ) -> Self {
        Self {
            submissions,
            problems,
            publisher,
            config,
            queues,
            compensation_backoff: Box::new(ExponentialBackoff::new(
                Duration::from_millis(COMPENSATION_RETRY_DELAY_MS),
                Duration::from_millis(COMPENSATION_MAX_DELAY_MS),
            )),
        }
    }

    /// Accept a graded submission for asynchronous judging
    pub async fn submit(&self, input: SubmissionInput) -> AppResult<Submission> {
        self.create_and_enqueue(input, false).await
    }

    /// Accept a test run; it goes to the test queue and never counts in statistics
    pub async fn test_run(&self, input: SubmissionInput) -> AppResult<Submission> {
        self.create_and_enqueue(input, true).await
    }

    async fn create_and_enqueue(
        &self,
        input: SubmissionInput,
        is_test_run: bool,
    ) -> AppResult<Submission> {
        validate_source_code(&input.source_code, self.config.max_source_bytes)
            .map_err(AppError::Validation)?;
        let language = validate_language(&input.language).map_err(AppError::Validation)?;

        let limits = self
            .problems
            .find_limits(input.problem_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Problem not found".to_string()))?;

        let submission = self
            .submissions
            .create(NewSubmission {
                problem_id: input.problem_id,
                user_id: input.user_id,
                language,
                source_code: input.source_code,
                is_test_run,
            })
            .await?;

        let job = Job::for_submission(
            &submission,
            &limits,
            self.config.default_time_limit,
            self.config.default_memory_limit,
        );
        let queue = if is_test_run {
            &self.queues.test
        } else {
            &self.queues.graded
        };

        if let Err(e) = self.publisher.publish(queue, &job).await {
            error!(
                submission_id = %submission.id,
                queue = %queue,
                error = %e,
                "Failed to enqueue submission"
            );
            self.compensate(submission.id).await;
            return Err(AppError::ServiceUnavailable(
                "Judging queue is unavailable, please retry later".to_string(),
            ));
        }

        info!(
            submission_id = %submission.id,
            user_id = %submission.user_id,
            problem_id = %submission.problem_id,
            language = %submission.language,
            queue = %queue,
            "Submission queued for judging"
        );

        Ok(submission)
    }

    /// Move a record whose job never reached the broker out of `Pending`.
    ///
    /// The write is retried up to [`COMPENSATION_ATTEMPTS`] times.
    async fn compensate(&self, id: Uuid) {
        for attempt in 1..=COMPENSATION_ATTEMPTS {
            match self
                .submissions
                .mark_internal_error(id, QUEUE_FAILURE_VERDICT)
                .await
            {
                Ok(true) => {
                    warn!(submission_id = %id, attempt, "Submission marked as internal error");
                    return;
                }
                Ok(false) => {
                    warn!(
                        submission_id = %id,
                        "Submission already left Pending, compensation skipped"
                    );
                    return;
                }
                Err(e) if attempt < COMPENSATION_ATTEMPTS => {
                    warn!(
                        submission_id = %id,
                        attempt,
                        error = %e,
                        "Compensating write failed, retrying"
                    );
                    tokio::time::sleep(self.compensation_backoff.next_delay(attempt)).await;
                }
                Err(e) => error!(
                    submission_id = %id,
                    attempts = COMPENSATION_ATTEMPTS,
                    error = %e,
                    "Compensating write failed, submission remains Pending"
                ),
            }
        }
    }

    /// Current status projection; a pure read
    pub async fn get_status(&self, id: Uuid) -> AppResult<Submission> {
        self.submissions
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Submission not found".to_string()))
    }

    /// A user's submissions, newest first
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        page: u32,
        limit: u32,
        status: Option<SubmissionStatus>,
    ) -> AppResult<(Vec<Submission>, i64)> {
        let page = page.max(1);
        let filter = SubmissionFilter {
            status,
            offset: i64::from(page - 1) * i64::from(limit),
            limit: i64::from(limit),
        };

        self.submissions.list_by_user(user_id, filter).await
    }

    /// Worker picked the job up
    pub async fn mark_judging(&self, id: Uuid) -> AppResult<TransitionOutcome> {
        let outcome = self.submissions.mark_judging(id).await?;
        if let TransitionOutcome::Applied(_) = outcome {
            info!(submission_id = %id, "Submission judging started");
        }
        Ok(outcome)
    }

    /// Store the worker's terminal result; a redelivered identical result is a no-op
    pub async fn record_judge_result(
        &self,
        id: Uuid,
        report: JudgeReport,
    ) -> AppResult<TransitionOutcome> {
        if !report.status.is_terminal() {
            return Err(AppError::Validation(format!(
                "'{}' is not a final status",
                report.status
            )));
        }

        let outcome = self.submissions.record_verdict(id, &report).await?;
        match &outcome {
            TransitionOutcome::Applied(s) => {
                info!(submission_id = %id, status = %s.status, "Submission judged")
            }
            TransitionOutcome::Unchanged(_) => {
                info!(submission_id = %id, "Duplicate judge result ignored")
            }
        }
        Ok(outcome)
    }
}
