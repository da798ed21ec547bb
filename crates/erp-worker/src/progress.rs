//! Progress reporting for running handlers.

use std::sync::Arc;

use erp_core::result::AppResult;
use erp_core::types::id::JobId;
use erp_database::JobStore;

/// Writes progress for one claimed job straight through to the store.
///
/// Updates are not buffered: a read after `report` returns sees the new
/// value. Reports made after the job left `Running` (for example after an
/// external cancel) are ignored and return `false`.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    job_id: JobId,
    store: Arc<dyn JobStore>,
}

impl ProgressReporter {
    /// Create a reporter for `job_id`.
    pub fn new(job_id: JobId, store: Arc<dyn JobStore>) -> Self {
        Self { job_id, store }
    }

    /// Record `progress` out of `total` units.
    pub async fn report(&self, progress: i32, total: i32) -> AppResult<bool> {
        let applied = self
            .store
            .update_progress(self.job_id, progress, total)
            .await?;
        tracing::debug!(
            job_id = %self.job_id,
            progress,
            total,
            applied,
            "Job progress reported"
        );
        Ok(applied)
    }
}
