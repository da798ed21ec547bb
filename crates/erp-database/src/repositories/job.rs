//! Job repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;

use erp_core::error::{AppError, ErrorKind};
use erp_core::result::AppResult;
use erp_core::types::id::JobId;
use erp_entity::job::model::clamp_progress;
use erp_entity::job::{Job, JobStatus, NewJob};

use crate::store::{JobFilter, JobStore, ensure_settable, stored_error};

/// Repository for the `background_jobs` table.
#[derive(Debug, Clone)]
pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    /// Create a new job repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for JobRepository {
    async fn create(&self, data: NewJob) -> AppResult<Job> {
        sqlx::query_as::<_, Job>(
            "INSERT INTO background_jobs (id, job_type, payload, created_by) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(JobId::new())
        .bind(&data.job_type)
        .bind(&data.payload)
        .bind(data.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create job", e))
    }

    async fn find_by_id(&self, id: JobId) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>("SELECT * FROM background_jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find job", e))
    }

    async fn list(&self, filter: &JobFilter) -> AppResult<Vec<Job>> {
        sqlx::query_as::<_, Job>(
            "SELECT * FROM background_jobs \
             WHERE ($1::job_status IS NULL OR status = $1) \
             AND ($2::text IS NULL OR job_type = $2) \
             AND ($3::uuid IS NULL OR created_by = $3) \
             ORDER BY created_at DESC \
             LIMIT $4",
        )
        .bind(filter.status)
        .bind(filter.job_type.as_deref())
        .bind(filter.created_by)
        .bind(filter.sql_limit())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list jobs", e))
    }

    async fn update_progress(&self, id: JobId, progress: i32, total: i32) -> AppResult<bool> {
        let (progress, total) = clamp_progress(progress, total);
        let result = sqlx::query(
            "UPDATE background_jobs SET progress = $2, total = $3, updated_at = NOW() \
             WHERE id = $1 AND status = 'running'",
        )
        .bind(id)
        .bind(progress)
        .bind(total)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to update job progress", e)
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_status(
        &self,
        id: JobId,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> AppResult<bool> {
        ensure_settable(status)?;
        let from: Vec<String> = status
            .predecessors()
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();

        let result = sqlx::query(
            "UPDATE background_jobs SET status = $2, error_message = $3, \
             completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status::text = ANY($4)",
        )
        .bind(id)
        .bind(status)
        .bind(stored_error(status, error_message))
        .bind(from)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to update job status", e)
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_result(&self, id: JobId, result: &serde_json::Value) -> AppResult<bool> {
        let outcome = sqlx::query(
            "UPDATE background_jobs SET result = $2, updated_at = NOW() \
             WHERE id = $1 AND status = 'running'",
        )
        .bind(id)
        .bind(result)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to store job result", e)
        })?;
        Ok(outcome.rows_affected() > 0)
    }

    /// The inner SELECT locks one pending row and skips rows locked by
    /// concurrent claimers; the lock is released when the statement commits.
    async fn claim_next(&self) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>(
            "UPDATE background_jobs SET status = 'running', started_at = NOW(), updated_at = NOW() \
             WHERE status = 'pending' AND id = ( \
                SELECT id FROM background_jobs \
                WHERE status = 'pending' \
                ORDER BY created_at ASC \
                LIMIT 1 \
                FOR UPDATE SKIP LOCKED \
             ) RETURNING *",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to claim job", e))
    }

    async fn count_by_status(&self, status: JobStatus) -> AppResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM background_jobs WHERE status = $1")
            .bind(status)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count jobs", e))
    }
}
