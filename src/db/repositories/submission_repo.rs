//! Submission repository
//!
//! Every status write is guarded in SQL by the current status so a late or
//! duplicate worker message can never move a record backwards.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::SubmissionStore;
use crate::{
    error::{AppError, AppResult},
    models::{
        AcceptedSolve, JudgeReport, NewSubmission, Submission, SubmissionFilter, SubmissionStatus,
        SubmissionTotals, TransitionOutcome,
    },
};

/// Postgres-backed submission store
#[derive(Clone)]
pub struct PgSubmissionStore {
    pool: PgPool,
}

impl PgSubmissionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lock the row for the rest of the transaction
    async fn lock_for_update(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> AppResult<Submission> {
        sqlx::query_as::<_, Submission>(r#"SELECT * FROM submissions WHERE id = $1 FOR UPDATE"#)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Submission {id} not found")))
    }
}

fn conflict(current: SubmissionStatus, requested: SubmissionStatus) -> AppError {
    AppError::Conflict(format!(
        "Submission is already '{current}' and cannot become '{requested}'"
    ))
}

#[async_trait]
impl SubmissionStore for PgSubmissionStore {
    async fn create(&self, new: NewSubmission) -> AppResult<Submission> {
        let mut tx = self.pool.begin().await?;

        let submission = sqlx::query_as::<_, Submission>(
            r#"
            INSERT INTO submissions (problem_id, user_id, language, source_code, status, is_test_run)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(new.problem_id)
        .bind(new.user_id)
        .bind(new.language.as_str())
        .bind(&new.source_code)
        .bind(SubmissionStatus::Pending.as_str())
        .bind(new.is_test_run)
        .fetch_one(&mut *tx)
        .await?;

        if !new.is_test_run {
            sqlx::query(
                r#"UPDATE problems SET total_submissions = total_submissions + 1 WHERE id = $1"#,
            )
            .bind(new.problem_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(submission)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Submission>> {
        let submission =
            sqlx::query_as::<_, Submission>(r#"SELECT * FROM submissions WHERE id = $1"#)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(submission)
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        filter: SubmissionFilter,
    ) -> AppResult<(Vec<Submission>, i64)> {
        let status = filter.status.map(|s| s.as_str());

        let submissions = sqlx::query_as::<_, Submission>(
            r#"
            SELECT * FROM submissions
            WHERE user_id = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id)
        .bind(status)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM submissions
            WHERE user_id = $1 AND ($2::text IS NULL OR status = $2)
            "#,
        )
        .bind(user_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok((submissions, total))
    }

    async fn mark_internal_error(&self, id: Uuid, verdict: &str) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE submissions
            SET status = $2, verdict = $3, updated_at = NOW()
            WHERE id = $1 AND status = $4
            "#,
        )
        .bind(id)
        .bind(SubmissionStatus::InternalError.as_str())
        .bind(verdict)
        .bind(SubmissionStatus::Pending.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_judging(&self, id: Uuid) -> AppResult<TransitionOutcome> {
        let mut tx = self.pool.begin().await?;
        let current = Self::lock_for_update(&mut tx, id).await?;

        match current.status {
            SubmissionStatus::Judging => return Ok(TransitionOutcome::Unchanged(current)),
            SubmissionStatus::Pending => {}
            status => return Err(conflict(status, SubmissionStatus::Judging)),
        }

        let updated = sqlx::query_as::<_, Submission>(
            r#"
            UPDATE submissions
            SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status = $3
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(SubmissionStatus::Judging.as_str())
        .bind(SubmissionStatus::Pending.as_str())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(TransitionOutcome::Applied(updated))
    }

    async fn record_verdict(&self, id: Uuid, report: &JudgeReport) -> AppResult<TransitionOutcome> {
        let mut tx = self.pool.begin().await?;
        let current = Self::lock_for_update(&mut tx, id).await?;

        if current.status.is_terminal() && current.status == report.status {
            return Ok(TransitionOutcome::Unchanged(current));
        }
        if !current.status.can_transition_to(report.status) || !report.status.is_terminal() {
            return Err(conflict(current.status, report.status));
        }

        let updated = sqlx::query_as::<_, Submission>(
            r#"
            UPDATE submissions
            SET status = $2,
                verdict = $3,
                execution_time = $4,
                memory_used = $5,
                test_cases_passed = $6,
                total_test_cases = $7,
                judged_at = COALESCE($8, NOW()),
                updated_at = NOW()
            WHERE id = $1 AND status IN ($9, $10)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(report.status.as_str())
        .bind(&report.verdict)
        .bind(report.execution_time)
        .bind(report.memory_used)
        .bind(report.test_cases_passed)
        .bind(report.total_test_cases)
        .bind(report.judged_at)
        .bind(SubmissionStatus::Pending.as_str())
        .bind(SubmissionStatus::Judging.as_str())
        .fetch_one(&mut *tx)
        .await?;

        if updated.status.is_accepted() && !updated.is_test_run {
            sqlx::query(
                r#"UPDATE problems SET accepted_submissions = accepted_submissions + 1 WHERE id = $1"#,
            )
            .bind(updated.problem_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(TransitionOutcome::Applied(updated))
    }

    async fn accepted_solves(&self, since: Option<DateTime<Utc>>) -> AppResult<Vec<AcceptedSolve>> {
        let solves = sqlx::query_as::<_, AcceptedSolve>(
            r#"
            SELECT DISTINCT s.user_id, u.username, s.problem_id, p.difficulty
            FROM submissions s
            JOIN users u ON u.id = s.user_id
            JOIN problems p ON p.id = s.problem_id
            WHERE s.status = $1
              AND s.is_test_run = FALSE
              AND ($2::timestamptz IS NULL OR s.created_at >= $2)
            "#,
        )
        .bind(SubmissionStatus::Accepted.as_str())
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(solves)
    }

    async fn submission_totals(&self, user_ids: &[Uuid]) -> AppResult<Vec<SubmissionTotals>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let totals = sqlx::query_as::<_, SubmissionTotals>(
            r#"
            SELECT user_id,
                   COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE status = $2) AS accepted
            FROM submissions
            WHERE is_test_run = FALSE AND user_id = ANY($1)
            GROUP BY user_id
            "#,
        )
        .bind(user_ids)
        .bind(SubmissionStatus::Accepted.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(totals)
    }
}
