//! Notification repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;

use erp_core::error::{AppError, ErrorKind};
use erp_core::result::AppResult;
use erp_core::types::id::{NotificationId, UserId};
use erp_entity::notification::{NewNotification, Notification};

use crate::store::NotificationStore;

/// Repository for the `job_notifications` table.
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    /// Create a new notification repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Count unread notifications for a user.
    pub async fn count_unread(&self, user_id: UserId) -> AppResult<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM job_notifications WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count unread", e))
    }
}

#[async_trait]
impl NotificationStore for NotificationRepository {
    async fn create(&self, data: NewNotification) -> AppResult<Notification> {
        sqlx::query_as::<_, Notification>(
            "INSERT INTO job_notifications (id, job_id, user_id, title, message) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(NotificationId::new())
        .bind(data.job_id)
        .bind(data.user_id)
        .bind(&data.title)
        .bind(&data.message)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to create notification", e)
        })
    }

    async fn find_unread(&self, user_id: UserId, limit: u32) -> AppResult<Vec<Notification>> {
        let limit = (limit > 0).then_some(i64::from(limit));
        sqlx::query_as::<_, Notification>(
            "SELECT * FROM job_notifications WHERE user_id = $1 AND is_read = FALSE \
             ORDER BY created_at DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list notifications", e)
        })
    }

    async fn mark_read(&self, id: NotificationId) -> AppResult<bool> {
        let result = sqlx::query("UPDATE job_notifications SET is_read = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark read", e))?;
        Ok(result.rows_affected() > 0)
    }
}
