//! In-memory job store.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use erp_core::result::AppResult;
use erp_core::types::id::JobId;
use erp_entity::job::model::clamp_progress;
use erp_entity::job::{Job, JobStatus, NewJob};

use crate::store::{JobFilter, JobStore, ensure_settable, stored_error};

#[derive(Debug, Default)]
struct Inner {
    jobs: HashMap<JobId, Job>,
    /// Insertion order, oldest first.
    order: Vec<JobId>,
    /// Claim order. Entries whose job left `Pending` are dropped on claim.
    pending: VecDeque<JobId>,
}

impl Inner {
    fn running_mut(&mut self, id: JobId) -> Option<&mut Job> {
        self.jobs
            .get_mut(&id)
            .filter(|job| job.status == JobStatus::Running)
    }
}

/// Job store backed by a `HashMap` behind an async lock.
///
/// Clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct MemoryJobStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryJobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, data: NewJob) -> AppResult<Job> {
        let job = Job::pending(data);
        let mut inner = self.inner.write().await;
        inner.order.push(job.id);
        inner.pending.push_back(job.id);
        inner.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn find_by_id(&self, id: JobId) -> AppResult<Option<Job>> {
        Ok(self.inner.read().await.jobs.get(&id).cloned())
    }

    async fn list(&self, filter: &JobFilter) -> AppResult<Vec<Job>> {
        let inner = self.inner.read().await;
        let matching = inner
            .order
            .iter()
            .rev()
            .filter_map(|id| inner.jobs.get(id))
            .filter(|job| filter.matches(job))
            .cloned();

        Ok(match filter.limit {
            0 => matching.collect(),
            n => matching.take(n as usize).collect(),
        })
    }

    async fn update_progress(&self, id: JobId, progress: i32, total: i32) -> AppResult<bool> {
        let (progress, total) = clamp_progress(progress, total);
        let mut inner = self.inner.write().await;
        let Some(job) = inner.running_mut(id) else {
            return Ok(false);
        };
        job.progress = progress;
        job.total = total;
        job.updated_at = Utc::now();
        Ok(true)
    }

    async fn update_status(
        &self,
        id: JobId,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> AppResult<bool> {
        ensure_settable(status)?;
        let mut inner = self.inner.write().await;
        let Some(job) = inner.jobs.get_mut(&id) else {
            return Ok(false);
        };
        if !job.status.can_transition_to(status) {
            return Ok(false);
        }

        let now = Utc::now();
        job.status = status;
        job.error_message = stored_error(status, error_message);
        job.completed_at = Some(now);
        job.updated_at = now;
        Ok(true)
    }

    async fn update_result(&self, id: JobId, result: &serde_json::Value) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        let Some(job) = inner.running_mut(id) else {
            return Ok(false);
        };
        job.result = Some(result.clone());
        job.updated_at = Utc::now();
        Ok(true)
    }

    async fn claim_next(&self) -> AppResult<Option<Job>> {
        let mut inner = self.inner.write().await;
        let Inner { jobs, pending, .. } = &mut *inner;
        while let Some(id) = pending.pop_front() {
            let Some(job) = jobs.get_mut(&id) else {
                continue;
            };
            // Cancelled while queued.
            if job.status != JobStatus::Pending {
                continue;
            }

            let now = Utc::now();
            job.status = JobStatus::Running;
            job.started_at = Some(now);
            job.updated_at = now;
            return Ok(Some(job.clone()));
        }
        Ok(None)
    }

    async fn count_by_status(&self, status: JobStatus) -> AppResult<i64> {
        let inner = self.inner.read().await;
        Ok(inner.jobs.values().filter(|job| job.status == status).count() as i64)
    }
}
