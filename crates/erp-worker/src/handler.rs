//! Job handler contract.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use erp_core::error::AppError;
use erp_entity::job::Job;

use crate::progress::ProgressReporter;

/// Trait for job handler implementations.
///
/// A handler runs one job to completion. It may report progress through the
/// reporter but never changes the job's status; the worker does that from
/// the returned outcome.
#[async_trait]
pub trait JobHandler: Send + Sync + fmt::Debug {
    /// Execute the job. `Ok(Some(value))` is stored as the job result.
    async fn execute(
        &self,
        job: &Job,
        progress: &ProgressReporter,
    ) -> Result<Option<Value>, JobExecutionError>;
}

/// Error from job execution. The display text becomes the job's
/// `error_message`.
#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// No handler is registered for the job type.
    #[error("no handler registered for type {0}")]
    NoHandler(String),

    /// The handler reported a failure.
    #[error("{0}")]
    Failed(String),

    /// The handler panicked.
    #[error("handler panicked: {0}")]
    Panicked(String),

    /// Internal error
    #[error("{0}")]
    Internal(#[from] AppError),
}

impl JobExecutionError {
    /// Create a handler failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Adapts an async closure into a [`JobHandler`].
///
/// The closure receives owned copies of the job and the reporter so the
/// returned future can be `'static`.
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn JobHandler>
where
    F: Fn(Job, ProgressReporter) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Value>, JobExecutionError>> + Send + 'static,
{
    Arc::new(FnHandler { f })
}

struct FnHandler<F> {
    f: F,
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> JobHandler for FnHandler<F>
where
    F: Fn(Job, ProgressReporter) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Value>, JobExecutionError>> + Send + 'static,
{
    async fn execute(
        &self,
        job: &Job,
        progress: &ProgressReporter,
    ) -> Result<Option<Value>, JobExecutionError> {
        (self.f)(job.clone(), progress.clone()).await
    }
}
