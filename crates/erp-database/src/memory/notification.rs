//! In-memory notification store.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use erp_core::result::AppResult;
use erp_core::types::id::{NotificationId, UserId};
use erp_entity::notification::{NewNotification, Notification};

use crate::store::NotificationStore;

/// Notification store backed by an append-only `Vec`.
#[derive(Debug, Clone, Default)]
pub struct MemoryNotificationStore {
    rows: Arc<RwLock<Vec<Notification>>>,
}

impl MemoryNotificationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored notification, oldest first.
    pub async fn all(&self) -> Vec<Notification> {
        self.rows.read().await.clone()
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn create(&self, data: NewNotification) -> AppResult<Notification> {
        let notification = Notification::unread(data);
        self.rows.write().await.push(notification.clone());
        Ok(notification)
    }

    async fn find_unread(&self, user_id: UserId, limit: u32) -> AppResult<Vec<Notification>> {
        let rows = self.rows.read().await;
        let unread = rows
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .cloned();

        Ok(match limit {
            0 => unread.collect(),
            n => unread.take(n as usize).collect(),
        })
    }

    async fn mark_read(&self, id: NotificationId) -> AppResult<bool> {
        let mut rows = self.rows.write().await;
        match rows.iter_mut().find(|n| n.id == id) {
            Some(n) => {
                n.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
