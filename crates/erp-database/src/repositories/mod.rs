//! PostgreSQL repository implementations.

pub mod job;
pub mod notification;

pub use job::JobRepository;
pub use notification::NotificationRepository;
