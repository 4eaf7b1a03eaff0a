//! JobHub server: job tracking store with scheduled retention cleanup.
//!
//! Wires configuration, logging, the selected job store and the cleanup
//! scheduler together, then runs until Ctrl+C or SIGTERM.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use jobhub_core::config::{AppConfig, StoreBackend};
use jobhub_core::error::AppError;
use jobhub_core::result::AppResult;
use jobhub_database::migration::run_migrations;
use jobhub_database::{DatabasePool, JobStore, MemoryJobRepository, PgJobRepository};
use jobhub_service::JobService;
use jobhub_worker::{CleanupSweeper, CronScheduler};

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

/// Load `config/default.toml`, the `JOBHUB_ENV` overlay and `JOBHUB__*` variables.
fn load_configuration() -> AppResult<AppConfig> {
    let env = std::env::var("JOBHUB_ENV").unwrap_or_else(|_| "development".to_string());
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
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Open the configured job store. The pool is returned so it can be
/// closed on shutdown.
async fn build_store(config: &AppConfig) -> AppResult<(Arc<dyn JobStore>, Option<DatabasePool>)> {
    match config.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory job store; jobs are lost on restart");
            Ok((Arc::new(MemoryJobRepository::new()), None))
        }
        StoreBackend::Postgres => {
            let db = DatabasePool::connect(&config.database).await?;
            if !db.health_check().await? {
                return Err(AppError::database(
                    "Database health check returned an unexpected value",
                ));
            }
            run_migrations(db.pool(), &config.store.table).await?;
            let repo = PgJobRepository::new(db.pool().clone(), &config.store.table)?;
            Ok((Arc::new(repo), Some(db)))
        }
    }
}

async fn run(config: AppConfig) -> AppResult<()> {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        backend = ?config.store.backend,
        table = %config.store.table,
        "Starting JobHub"
    );

    let (store, db) = build_store(&config).await?;
    let service = JobService::new(Arc::clone(&store), config.store.max_result_limit);
    tracing::debug!(?service, "Job service ready");

    let mut scheduler = CronScheduler::new().await?;
    if config.cleanup.enabled {
        let sweeper = Arc::new(CleanupSweeper::new(
            Arc::clone(&store),
            config.cleanup.clone(),
        ));
        scheduler
            .register_cleanup(sweeper, config.cleanup.interval()?)
            .await?;
    } else {
        tracing::info!("Job cleanup disabled");
    }
    scheduler.start().await?;

    shutdown_signal().await?;
    tracing::info!("Shutdown signal received");

    scheduler.shutdown().await?;
    if let Some(db) = db {
        db.close().await;
    }
    tracing::info!("JobHub stopped");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() -> AppResult<()> {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| AppError::internal(format!("Failed to listen for Ctrl+C: {e}")))
    };

    #[cfg(unix)]
    let terminate = async {
        let mut signal =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .map_err(|e| AppError::internal(format!("Failed to install SIGTERM handler: {e}")))?;
        signal.recv().await;
        Ok::<(), AppError>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<AppResult<()>>();

    tokio::select! {
        result = ctrl_c => result,
        result = terminate => result,
    }
}
