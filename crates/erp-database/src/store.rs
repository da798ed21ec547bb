//! Storage contracts for jobs and notifications.
//!
//! Workers only ever talk to these traits, so the same pool runs against
//! PostgreSQL ([`crate::JobRepository`]) or the in-memory stores
//! ([`crate::MemoryJobStore`]).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use erp_core::error::AppError;
use erp_core::result::AppResult;
use erp_core::types::id::{JobId, NotificationId, UserId};
use erp_entity::job::{Job, JobStatus, NewJob};
use erp_entity::notification::{NewNotification, Notification};

/// Filters for [`JobStore::list`]. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobFilter {
    /// Only jobs in this status.
    pub status: Option<JobStatus>,
    /// Only jobs of this type.
    pub job_type: Option<String>,
    /// Only jobs submitted by this actor.
    pub created_by: Option<UserId>,
    /// Maximum number of rows; `0` means no limit.
    #[serde(default)]
    pub limit: u32,
}

impl JobFilter {
    /// Filter on status.
    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Filter on job type.
    pub fn with_job_type(mut self, job_type: impl Into<String>) -> Self {
        self.job_type = Some(job_type.into());
        self
    }

    /// Filter on submitter.
    pub fn with_created_by(mut self, user_id: UserId) -> Self {
        self.created_by = Some(user_id);
        self
    }

    /// Cap the number of rows returned.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Whether `job` passes every set filter.
    pub fn matches(&self, job: &Job) -> bool {
        self.status.is_none_or(|s| job.status == s)
            && self.job_type.as_deref().is_none_or(|t| job.job_type == t)
            && self.created_by.is_none_or(|u| job.created_by == Some(u))
    }

    /// The limit as an optional SQL `LIMIT` value.
    pub fn sql_limit(&self) -> Option<i64> {
        (self.limit > 0).then_some(i64::from(self.limit))
    }
}

/// Durable table of job records.
///
/// Every mutation is keyed by job id and guarded by the job state machine:
/// writes that do not apply to the stored status return `Ok(false)` rather
/// than overwriting it.
#[async_trait]
pub trait JobStore: Send + Sync + std::fmt::Debug + 'static {
    /// Insert a new job in `Pending` status.
    async fn create(&self, data: NewJob) -> AppResult<Job>;

    /// Find a job by id.
    async fn find_by_id(&self, id: JobId) -> AppResult<Option<Job>>;

    /// List jobs matching `filter`, newest first.
    async fn list(&self, filter: &JobFilter) -> AppResult<Vec<Job>>;

    /// Record progress for a running job. `progress` is clamped to
    /// `0..=total`.
    async fn update_progress(&self, id: JobId, progress: i32, total: i32) -> AppResult<bool>;

    /// Move a job to a terminal status. `error_message` is stored only for
    /// [`JobStatus::Failed`]. `Running` is rejected: it is entered through
    /// [`JobStore::claim_next`] alone.
    async fn update_status(
        &self,
        id: JobId,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> AppResult<bool>;

    /// Store the result of a running job.
    async fn update_result(&self, id: JobId, result: &serde_json::Value) -> AppResult<bool>;

    /// Atomically take the oldest unclaimed `Pending` job, mark it
    /// `Running`, and stamp `started_at`. Never waits on a job another
    /// claimer holds; returns `None` when nothing is claimable.
    async fn claim_next(&self) -> AppResult<Option<Job>>;

    /// Number of jobs currently in `status`.
    async fn count_by_status(&self, status: JobStatus) -> AppResult<i64>;
}

/// Append-only store of job outcome notifications.
#[async_trait]
pub trait NotificationStore: Send + Sync + std::fmt::Debug + 'static {
    /// Insert an unread notification.
    async fn create(&self, data: NewNotification) -> AppResult<Notification>;

    /// Unread notifications for a user, newest first; `limit == 0` means no
    /// limit.
    async fn find_unread(&self, user_id: UserId, limit: u32) -> AppResult<Vec<Notification>>;

    /// Mark a notification as read. Returns `false` if it does not exist.
    async fn mark_read(&self, id: NotificationId) -> AppResult<bool>;
}

/// Reject status writes that bypass the claim protocol.
pub(crate) fn ensure_settable(status: JobStatus) -> AppResult<()> {
    if status.is_terminal() {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "status '{status}' cannot be set directly"
        )))
    }
}

/// The error message to persist alongside `status`.
pub(crate) fn stored_error(status: JobStatus, error_message: Option<&str>) -> Option<String> {
    match status {
        JobStatus::Failed => error_message.map(str::to_string),
        _ => None,
    }
}
