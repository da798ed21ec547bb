//! Submission and query facade over the job store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use erp_core::error::{AppError, ErrorKind};
use erp_core::result::AppResult;
use erp_core::types::id::{JobId, UserId};
use erp_database::{JobFilter, JobStore};
use erp_entity::job::{Job, JobStatus, NewJob};

/// Entry point for callers outside the worker pool: submit, inspect, and
/// cancel jobs.
#[derive(Debug, Clone)]
pub struct JobQueue {
    store: Arc<dyn JobStore>,
}

impl JobQueue {
    /// Create a queue over `store`.
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> Arc<dyn JobStore> {
        Arc::clone(&self.store)
    }

    /// Submit a new job.
    ///
    /// The job type is not checked against the registry; a type nobody
    /// handles is stored and later failed by the worker that claims it.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Submission`] if the payload cannot be serialized
    /// or the job cannot be stored. No job is created in either case.
    pub async fn submit<T>(
        &self,
        job_type: &str,
        payload: &T,
        created_by: Option<UserId>,
    ) -> AppResult<Job>
    where
        T: Serialize + ?Sized,
    {
        let payload = serde_json::to_value(payload).map_err(|e| {
            AppError::with_source(ErrorKind::Submission, "Failed to serialize job payload", e)
        })?;

        let job = self
            .store
            .create(NewJob {
                job_type: job_type.to_string(),
                payload,
                created_by,
            })
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Submission, "Failed to enqueue job", e))?;

        tracing::debug!(job_id = %job.id, job_type = %job.job_type, "Enqueued job");
        Ok(job)
    }

    /// Get a job by id.
    pub async fn get(&self, id: JobId) -> AppResult<Job> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Job {id} not found")))
    }

    /// List jobs, newest first.
    pub async fn list(&self, filter: &JobFilter) -> AppResult<Vec<Job>> {
        self.store.list(filter).await
    }

    /// Cancel a pending or running job.
    ///
    /// A running handler is not interrupted; its outcome is discarded when
    /// it returns.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::NotFound`] for an unknown id, [`ErrorKind::Conflict`] if
    /// the job already reached a terminal status.
    pub async fn cancel(&self, id: JobId) -> AppResult<Job> {
        if self
            .store
            .update_status(id, JobStatus::Cancelled, None)
            .await?
        {
            tracing::info!(job_id = %id, "Job cancelled");
            return self.get(id).await;
        }

        let job = self.get(id).await?;
        Err(AppError::conflict(format!(
            "Job {id} is already {}",
            job.status
        )))
    }

    /// Count jobs per status.
    pub async fn stats(&self) -> AppResult<QueueStats> {
        Ok(QueueStats {
            pending: self.store.count_by_status(JobStatus::Pending).await?,
            running: self.store.count_by_status(JobStatus::Running).await?,
            completed: self.store.count_by_status(JobStatus::Completed).await?,
            failed: self.store.count_by_status(JobStatus::Failed).await?,
            cancelled: self.store.count_by_status(JobStatus::Cancelled).await?,
        })
    }
}

/// Queue statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Number of pending jobs
    pub pending: i64,
    /// Number of running jobs
    pub running: i64,
    /// Number of completed jobs
    pub completed: i64,
    /// Number of failed jobs
    pub failed: i64,
    /// Number of cancelled jobs
    pub cancelled: i64,
}
