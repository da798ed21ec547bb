//! Fire-and-forget job outcome notifications.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

use erp_core::result::AppResult;
use erp_core::types::id::{JobId, NotificationId, UserId};
use erp_database::NotificationStore;
use erp_entity::job::Job;
use erp_entity::notification::{NewNotification, Notification};

/// Tells job submitters how their jobs ended.
///
/// Delivery is at most once. A failed insert is logged and dropped; it never
/// touches the job record. Clones share one task tracker, so [`flush`]
/// on any clone waits for inserts spawned by all of them.
///
/// [`flush`]: NotificationSink::flush
#[derive(Debug, Clone)]
pub struct NotificationSink {
    store: Arc<dyn NotificationStore>,
    tracker: TaskTracker,
}

impl NotificationSink {
    /// Create a sink writing to `store`.
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self {
            store,
            tracker: TaskTracker::new(),
        }
    }

    /// Insert a notification in the background and return immediately.
    ///
    /// Must be called from within a Tokio runtime. The returned handle may be
    /// dropped; it exists so callers can wait for delivery in tests.
    pub fn notify(
        &self,
        job_id: JobId,
        user_id: UserId,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let data = NewNotification {
            job_id,
            user_id,
            title: title.into(),
            message: message.into(),
        };

        self.tracker.spawn(async move {
            match store.create(data).await {
                Ok(n) => {
                    tracing::debug!(job_id = %job_id, notification_id = %n.id, "Notification sent");
                }
                Err(e) => {
                    tracing::warn!(job_id = %job_id, user_id = %user_id, error = %e, "Failed to send job notification");
                }
            }
        })
    }

    /// Wait until every insert spawned so far has finished.
    ///
    /// Call after the worker pool stopped and before the store goes away.
    /// The sink stays usable afterwards.
    pub async fn flush(&self) {
        let pending = self.tracker.len();
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
        tracing::debug!(pending, "Notification sink flushed");
    }

    /// Notify the submitter that `job` completed. No-op without a submitter.
    pub fn job_completed(&self, job: &Job) -> Option<JoinHandle<()>> {
        let user_id = job.created_by?;
        Some(self.notify(
            job.id,
            user_id,
            format!("Job Completed: {}", job.job_type),
            "Your job has completed successfully!",
        ))
    }

    /// Notify the submitter that `job` failed with `error`. No-op without a
    /// submitter.
    pub fn job_failed(&self, job: &Job, error: &str) -> Option<JoinHandle<()>> {
        let user_id = job.created_by?;
        Some(self.notify(
            job.id,
            user_id,
            format!("Job Failed: {}", job.job_type),
            format!("Job failed with error: {error}"),
        ))
    }

    /// Unread notifications for a user, newest first. `limit == 0` means no
    /// limit.
    pub async fn list_unread(&self, user_id: UserId, limit: u32) -> AppResult<Vec<Notification>> {
        self.store.find_unread(user_id, limit).await
    }

    /// Mark a notification as read.
    pub async fn mark_read(&self, id: NotificationId) -> AppResult<bool> {
        self.store.mark_read(id).await
    }
}
