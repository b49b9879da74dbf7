//! Problem repository

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::ProblemStore;
use crate::{error::AppResult, models::ProblemLimits};

/// Postgres-backed problem reads
#[derive(Clone)]
pub struct PgProblemStore {
    pool: PgPool,
}

impl PgProblemStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProblemStore for PgProblemStore {
    async fn find_limits(&self, id: Uuid) -> AppResult<Option<ProblemLimits>> {
        let limits = sqlx::query_as::<_, ProblemLimits>(
            r#"SELECT id, time_limit, memory_limit FROM problems WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(limits)
    }
}
