//! ERP job server
//!
//! Runs the background job worker pool against the ERP database until a
//! shutdown signal arrives.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use erp_core::config::AppConfig;
use erp_core::error::AppError;
use erp_database::DatabasePool;
use erp_worker::{HandlerRegistry, JobQueue, NotificationSink, PoolOptions, WorkerPool};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Load configuration from files and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("ERP_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting ERP job server v{}", env!("CARGO_PKG_VERSION"));

    // ── Database connection + migrations ─────────────────────────
    let db = DatabasePool::connect(&config.database).await?;
    if !db.health_check().await? {
        return Err(AppError::database("Database health check returned an unexpected value"));
    }
    db.run_migrations().await?;

    let jobs = Arc::new(db.jobs());
    let sink = NotificationSink::new(Arc::new(db.notifications()));

    // Handlers are registered by the embedding application before start.
    let registry = Arc::new(HandlerRegistry::new());
    let types = registry.registered_types().await;
    if types.is_empty() {
        tracing::warn!("No job handlers registered; claimed jobs will fail");
    } else {
        tracing::info!(handlers = ?types, "Job handlers registered");
    }

    let stats = JobQueue::new(jobs.clone()).stats().await?;
    tracing::info!(
        pending = stats.pending,
        running = stats.running,
        "Job queue state at startup"
    );

    // ── Worker pool ──────────────────────────────────────────────
    let pool = if config.worker.enabled {
        let pool = WorkerPool::start(
            PoolOptions::from(&config.worker),
            jobs,
            registry,
            sink.clone(),
        )
        .map_err(|e| AppError::configuration(e.to_string()))?;
        Some(pool)
    } else {
        tracing::info!("Worker pool disabled by configuration");
        None
    };

    shutdown_signal().await?;
    tracing::info!("Shutdown signal received, draining workers...");

    if let Some(pool) = pool {
        if let Err(e) = pool.stop().await {
            tracing::error!(error = %e, "Worker pool did not shut down cleanly");
        }
    }

    // Outcomes of the jobs drained above are still being inserted.
    sink.flush().await;

    db.close().await;
    tracing::info!("ERP job server stopped");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() -> Result<(), AppError> {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| AppError::internal(format!("Failed to listen for Ctrl+C: {e}")))
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .map_err(|e| AppError::internal(format!("Failed to install SIGTERM handler: {e}")))?
            .recv()
            .await;
        Ok::<(), AppError>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<(), AppError>>();

    tokio::select! {
        res = ctrl_c => res,
        res = terminate => res,
    }
}
