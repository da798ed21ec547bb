//! Job entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use erp_core::types::id::{JobId, UserId};

use super::status::JobStatus;

/// Default `total` for a freshly submitted job.
pub const DEFAULT_TOTAL: i32 = 100;

/// A background job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Job {
    /// Unique job identifier.
    pub id: JobId,
    /// Job type; selects the handler (e.g., `"backup_create"`).
    pub job_type: String,
    /// Current job status.
    pub status: JobStatus,
    /// Handler-specific payload (JSON).
    pub payload: serde_json::Value,
    /// Result data, set only on successful completion.
    pub result: Option<serde_json::Value>,
    /// Error message, set only on failure.
    pub error_message: Option<String>,
    /// Units of work done so far.
    pub progress: i32,
    /// Units of work in total.
    pub total: i32,
    /// When a worker claimed the job.
    pub started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
    /// Actor who submitted the job; receives the outcome notification.
    pub created_by: Option<UserId>,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// When the job was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Build the row for a newly submitted job.
    pub fn pending(data: NewJob) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            job_type: data.job_type,
            status: JobStatus::Pending,
            payload: data.payload,
            result: None,
            error_message: None,
            progress: 0,
            total: DEFAULT_TOTAL,
            started_at: None,
            completed_at: None,
            created_by: data.created_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Completion as a percentage in `0..=100`.
    pub fn percent_complete(&self) -> u8 {
        if self.total <= 0 {
            return if self.status == JobStatus::Completed { 100 } else { 0 };
        }
        let pct = i64::from(self.progress.clamp(0, self.total)) * 100 / i64::from(self.total);
        pct as u8
    }
}

/// Data required to create a new job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
    /// Job type identifier.
    pub job_type: String,
    /// Handler-specific payload.
    pub payload: serde_json::Value,
    /// Actor who submitted the job.
    pub created_by: Option<UserId>,
}

/// Clamp a progress report so that `0 <= progress <= total`.
pub fn clamp_progress(progress: i32, total: i32) -> (i32, i32) {
    let total = total.max(0);
    (progress.clamp(0, total), total)
}
