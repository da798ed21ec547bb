//! Worker pool: spawns workers and stops them cooperatively.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use erp_core::config::WorkerConfig;
use erp_database::JobStore;

use crate::notifier::NotificationSink;
use crate::registry::HandlerRegistry;
use crate::runner::Worker;

/// Errors from starting or stopping the pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Configuration error (zero workers, zero poll interval).
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A worker task panicked outside a handler.
    #[error("Worker {worker} panicked: {reason}")]
    WorkerPanicked { worker: usize, reason: String },
}

/// Pool sizing and polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolOptions {
    /// Number of workers; the hard cap on concurrently executing jobs.
    pub workers: usize,
    /// How long an idle worker sleeps between polls.
    pub poll_interval: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self::from(&WorkerConfig::default())
    }
}

impl From<&WorkerConfig> for PoolOptions {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            workers: config.concurrency,
            poll_interval: Duration::from_secs(config.poll_interval_seconds),
        }
    }
}

impl PoolOptions {
    /// Check that the pool can run with these options.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.workers == 0 {
            return Err(PoolError::InvalidConfig(
                "workers must be greater than 0".into(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(PoolError::InvalidConfig(
                "poll_interval must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// A running set of workers sharing one store and one registry.
#[derive(Debug)]
pub struct WorkerPool {
    workers: Vec<JoinHandle<()>>,
    cancel_tx: watch::Sender<bool>,
}

impl WorkerPool {
    /// Spawn `options.workers` workers on the current Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfig`] if the options are invalid.
    #[must_use = "the pool must be stopped to drain its workers"]
    pub fn start(
        options: PoolOptions,
        store: Arc<dyn JobStore>,
        registry: Arc<HandlerRegistry>,
        sink: NotificationSink,
    ) -> Result<Self, PoolError> {
        options.validate()?;

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let workers = (0..options.workers)
            .map(|id| {
                let worker = Worker::new(
                    id,
                    Arc::clone(&store),
                    Arc::clone(&registry),
                    sink.clone(),
                    options.poll_interval,
                );
                tokio::spawn(worker.run(cancel_rx.clone()))
            })
            .collect();

        tracing::info!(
            workers = options.workers,
            poll_interval_secs = options.poll_interval.as_secs_f64(),
            "Worker pool started"
        );

        Ok(Self { workers, cancel_tx })
    }

    /// Number of workers in the pool.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Signal every worker to stop and wait for all of them to exit.
    ///
    /// In-flight handlers run to completion. No claims happen after this
    /// returns.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::WorkerPanicked`] for the first worker task that
    /// panicked. All workers are awaited regardless.
    pub async fn stop(self) -> Result<(), PoolError> {
        tracing::info!(workers = self.workers.len(), "Stopping worker pool");
        self.cancel_tx.send_replace(true);

        let mut first_error = None;
        for (worker, handle) in self.workers.into_iter().enumerate() {
            if let Err(e) = handle.await {
                tracing::error!(worker, error = %e, "Worker task ended abnormally");
                first_error.get_or_insert(PoolError::WorkerPanicked {
                    worker,
                    reason: e.to_string(),
                });
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => {
                tracing::info!("All workers shut down");
                Ok(())
            }
        }
    }
}
