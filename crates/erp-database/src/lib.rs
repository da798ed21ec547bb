//! # erp-database
//!
//! Durable storage for background jobs and their notifications: the
//! [`JobStore`] and [`NotificationStore`] contracts, the PostgreSQL
//! repositories that implement them, and process-local in-memory stores
//! with the same semantics.

pub mod connection;
pub mod memory;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use memory::{MemoryJobStore, MemoryNotificationStore};
pub use repositories::{JobRepository, NotificationRepository};
pub use store::{JobFilter, JobStore, NotificationStore};
