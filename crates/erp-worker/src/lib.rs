//! Background job execution for the ERP.
//!
//! This crate provides:
//! - A handler registry mapping job types to [`JobHandler`]s
//! - A submission and query facade over a [`erp_database::JobStore`]
//! - A worker loop that claims jobs and drives them to a terminal status
//! - A worker pool with cooperative shutdown
//! - A fire-and-forget notification sink for job outcomes

pub mod handler;
pub mod notifier;
pub mod pool;
pub mod progress;
pub mod queue;
pub mod registry;
pub mod runner;

pub use handler::{JobExecutionError, JobHandler, handler_fn};
pub use notifier::NotificationSink;
pub use pool::{PoolError, PoolOptions, WorkerPool};
pub use progress::ProgressReporter;
pub use queue::{JobQueue, QueueStats};
pub use registry::HandlerRegistry;
pub use runner::Worker;
