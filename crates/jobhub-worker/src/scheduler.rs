//! Interval scheduler driving the retention sweep.

use std::sync::Arc;
use std::time::Duration;

use tokio_cron_scheduler::{Job as ScheduledJob, JobScheduler};
use tracing::{debug, info};

use jobhub_core::error::AppError;
use jobhub_core::result::AppResult;

use crate::jobs::CleanupSweeper;

/// Wraps a `tokio-cron-scheduler` instance owning the periodic tasks.
pub struct CronScheduler {
    scheduler: JobScheduler,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler").finish()
    }
}

impl CronScheduler {
    /// Create an empty, stopped scheduler.
    pub async fn new() -> AppResult<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;
        Ok(Self { scheduler })
    }

    /// Run `sweeper` every `interval`.
    ///
    /// A tick that fires while the previous sweep is still running is
    /// skipped by the sweeper itself.
    pub async fn register_cleanup(
        &self,
        sweeper: Arc<CleanupSweeper>,
        interval: Duration,
    ) -> AppResult<()> {
        let job = ScheduledJob::new_repeated_async(interval, move |_uuid, _lock| {
            let sweeper = Arc::clone(&sweeper);
            Box::pin(async move {
                debug!("Job cleanup tick");
                sweeper.tick().await;
            })
        })
        .map_err(|e| AppError::internal(format!("Failed to create job_cleanup schedule: {e}")))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add job_cleanup schedule: {e}")))?;

        info!(interval_secs = interval.as_secs(), "Registered: job_cleanup");
        Ok(())
    }

    /// Start firing registered tasks.
    pub async fn start(&self) -> AppResult<()> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;
        info!("Scheduler started");
        Ok(())
    }

    /// Stop the scheduler. A sweep already in progress is not interrupted.
    pub async fn shutdown(&mut self) -> AppResult<()> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;
        info!("Scheduler shut down");
        Ok(())
    }
}
