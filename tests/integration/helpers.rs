//! Shared test helpers for integration tests.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use erp_core::types::id::JobId;
use erp_database::{JobStore, MemoryJobStore, MemoryNotificationStore};
use erp_entity::job::{Job, JobStatus};
use erp_worker::{
    HandlerRegistry, JobHandler, JobQueue, NotificationSink, PoolOptions, WorkerPool, handler_fn,
};

/// Poll interval used by every test pool.
pub const POLL: Duration = Duration::from_millis(10);

/// How long `wait_until` waits before failing the test.
const WAIT_LIMIT: Duration = Duration::from_secs(5);

/// In-memory engine: stores, registry, and facade, without a running pool.
pub struct TestEngine {
    pub jobs: Arc<MemoryJobStore>,
    pub notifications: Arc<MemoryNotificationStore>,
    pub registry: Arc<HandlerRegistry>,
    pub queue: JobQueue,
    pub sink: NotificationSink,
}

impl TestEngine {
    pub fn new() -> Self {
        let jobs = Arc::new(MemoryJobStore::new());
        let notifications = Arc::new(MemoryNotificationStore::new());
        Self {
            queue: JobQueue::new(jobs.clone()),
            sink: NotificationSink::new(notifications.clone()),
            registry: Arc::new(HandlerRegistry::new()),
            jobs,
            notifications,
        }
    }

    /// Register a handler that stores the payload as the result.
    pub async fn register_echo(&self) {
        self.register(
            "echo",
            handler_fn(|job, _progress| async move { Ok(Some(job.payload)) }),
        )
        .await;
    }

    pub async fn register(&self, job_type: &str, handler: Arc<dyn JobHandler>) {
        self.registry.register(job_type, handler).await;
    }

    /// Start a pool of `workers` workers polling every [`POLL`].
    pub fn start(&self, workers: usize) -> WorkerPool {
        WorkerPool::start(
            PoolOptions {
                workers,
                poll_interval: POLL,
            },
            self.jobs.clone(),
            self.registry.clone(),
            self.sink.clone(),
        )
        .expect("Failed to start worker pool")
    }

    /// Wait until job `id` reaches a terminal status.
    pub async fn wait_terminal(&self, id: JobId) -> Job {
        let queue = &self.queue;
        wait_until(|| async move {
            let job = queue.get(id).await.expect("job exists");
            job.is_terminal().then_some(job)
        })
        .await
    }

    /// Wait until no job is pending or running.
    pub async fn wait_drained(&self) {
        let jobs = &self.jobs;
        wait_until(|| async move {
            let pending = jobs.count_by_status(JobStatus::Pending).await.unwrap();
            let running = jobs.count_by_status(JobStatus::Running).await.unwrap();
            (pending + running == 0).then_some(())
        })
        .await
    }
}

/// Poll `check` until it yields a value, failing after a fixed limit.
pub async fn wait_until<T, F, Fut>(mut check: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    tokio::time::timeout(WAIT_LIMIT, async {
        loop {
            if let Some(value) = check().await {
                return value;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time")
}
