//! Process-local stores.
//!
//! These mirror the PostgreSQL repositories row for row. They back the unit
//! and integration tests and allow embedding the worker pool without a
//! database; nothing survives a restart.

pub mod job;
pub mod notification;

pub use job::MemoryJobStore;
pub use notification::MemoryNotificationStore;
