//! Worker loop. Claims jobs and drives them to a terminal status.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::watch;
use tokio::time;

use erp_database::JobStore;
use erp_entity::job::{Job, JobStatus};

use crate::handler::JobExecutionError;
use crate::notifier::NotificationSink;
use crate::progress::ProgressReporter;
use crate::registry::HandlerRegistry;

/// One pool slot. Runs at most one handler at a time.
#[derive(Debug, Clone)]
pub struct Worker {
    /// Worker identifier, for logs.
    id: usize,
    store: Arc<dyn JobStore>,
    registry: Arc<HandlerRegistry>,
    sink: NotificationSink,
    /// Sleep between polls when the queue is empty.
    poll_interval: Duration,
}

impl Worker {
    /// Create a worker.
    pub fn new(
        id: usize,
        store: Arc<dyn JobStore>,
        registry: Arc<HandlerRegistry>,
        sink: NotificationSink,
        poll_interval: Duration,
    ) -> Self {
        Self {
            id,
            store,
            registry,
            sink,
            poll_interval,
        }
    }

    /// Run until the cancel signal is received.
    ///
    /// Cancellation is checked between jobs only; a running handler always
    /// finishes first. After a job the worker polls again at once, so a
    /// backlog drains without waiting for the interval.
    pub async fn run(self, mut cancel: watch::Receiver<bool>) {
        tracing::info!(
            worker = self.id,
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Worker started"
        );

        loop {
            if *cancel.borrow() {
                break;
            }

            if self.poll_once().await {
                continue;
            }

            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        break;
                    }
                }
                _ = time::sleep(self.poll_interval) => {}
            }
        }

        tracing::info!(worker = self.id, "Worker stopped");
    }

    /// Claim and process one job. Returns `true` if a job was claimed.
    pub async fn poll_once(&self) -> bool {
        match self.store.claim_next().await {
            Ok(Some(job)) => {
                self.process(job).await;
                true
            }
            Ok(None) => {
                tracing::trace!(worker = self.id, "No pending jobs");
                false
            }
            Err(e) => {
                tracing::error!(worker = self.id, error = %e, "Failed to claim job");
                false
            }
        }
    }

    async fn process(&self, job: Job) {
        tracing::info!(
            worker = self.id,
            job_id = %job.id,
            job_type = %job.job_type,
            "Processing job"
        );

        let Some(handler) = self.registry.lookup(&job.job_type).await else {
            let err = JobExecutionError::NoHandler(job.job_type.clone());
            tracing::warn!(worker = self.id, job_id = %job.id, "{err}");
            self.finish(&job, JobStatus::Failed, Some(&err.to_string()))
                .await;
            return;
        };

        let reporter = ProgressReporter::new(job.id, Arc::clone(&self.store));
        let outcome = AssertUnwindSafe(handler.execute(&job, &reporter))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(JobExecutionError::Panicked(panic_message(&*panic))));

        match outcome {
            Ok(result) => {
                if let Some(value) = &result {
                    if let Err(e) = self.store.update_result(job.id, value).await {
                        tracing::error!(job_id = %job.id, error = %e, "Failed to store job result");
                    }
                }
                if self.finish(&job, JobStatus::Completed, None).await {
                    tracing::info!(worker = self.id, job_id = %job.id, "Job completed");
                    self.sink.job_completed(&job);
                }
            }
            Err(err) => {
                let message = err.to_string();
                tracing::warn!(worker = self.id, job_id = %job.id, error = %message, "Job failed");
                if self.finish(&job, JobStatus::Failed, Some(&message)).await {
                    self.sink.job_failed(&job, &message);
                }
            }
        }
    }

    /// Write a terminal status. Returns `true` if this worker's write took
    /// effect.
    async fn finish(&self, job: &Job, status: JobStatus, error: Option<&str>) -> bool {
        match self.store.update_status(job.id, status, error).await {
            Ok(true) => true,
            Ok(false) => {
                tracing::warn!(
                    job_id = %job.id,
                    status = %status,
                    "Job left running before the worker finished; outcome discarded"
                );
                false
            }
            Err(e) => {
                tracing::error!(
                    job_id = %job.id,
                    status = %status,
                    error = %e,
                    "Failed to record job outcome"
                );
                false
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
