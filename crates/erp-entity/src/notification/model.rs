//! Notification entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use erp_core::types::id::{JobId, NotificationId, UserId};

/// A one-way message telling a user how their job ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Notification {
    /// Unique notification identifier.
    pub id: NotificationId,
    /// The job this notification is about (informational only).
    pub job_id: JobId,
    /// The recipient, copied from the job's `created_by`.
    pub user_id: UserId,
    /// Notification title.
    pub title: String,
    /// Notification body text.
    pub message: String,
    /// Whether the user has read this notification.
    pub is_read: bool,
    /// When the notification was created.
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Build an unread notification row.
    pub fn unread(data: NewNotification) -> Self {
        Self {
            id: NotificationId::new(),
            job_id: data.job_id,
            user_id: data.user_id,
            title: data.title,
            message: data.message,
            is_read: false,
            created_at: Utc::now(),
        }
    }
}

/// Data required to create a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNotification {
    /// The job the notification is about.
    pub job_id: JobId,
    /// The recipient.
    pub user_id: UserId,
    /// Notification title.
    pub title: String,
    /// Notification body text.
    pub message: String,
}
