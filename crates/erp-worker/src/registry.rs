//! Maps job types to handlers.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::handler::JobHandler;

/// Registered job handlers by type.
///
/// Meant to be filled during startup, before the pool starts. Workers only
/// take the read lock.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn JobHandler>>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. A later registration for the same type replaces
    /// the earlier one.
    pub async fn register(&self, job_type: impl Into<String>, handler: Arc<dyn JobHandler>) {
        let job_type = job_type.into();
        let replaced = self
            .handlers
            .write()
            .await
            .insert(job_type.clone(), handler)
            .is_some();

        if replaced {
            tracing::warn!(job_type = %job_type, "Replaced job handler");
        } else {
            tracing::info!(job_type = %job_type, "Registered job handler");
        }
    }

    /// Find the handler for a job type.
    pub async fn lookup(&self, job_type: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.read().await.get(job_type).cloned()
    }

    /// Check if a handler is registered for a job type.
    pub async fn contains(&self, job_type: &str) -> bool {
        self.handlers.read().await.contains_key(job_type)
    }

    /// Registered job types, sorted.
    pub async fn registered_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.read().await.keys().cloned().collect();
        types.sort();
        types
    }
}
