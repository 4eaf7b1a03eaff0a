//! Retention sweep: purges aged terminal jobs and reports stale running ones.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use jobhub_core::config::CleanupConfig;
use jobhub_core::error::AppError;
use jobhub_core::result::AppResult;
use jobhub_database::JobStore;
use jobhub_entity::job::JobStatus;

/// What one sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Failed jobs removed.
    pub failed_deleted: u64,
    /// Finished jobs removed.
    pub finished_deleted: u64,
    /// Running jobs untouched for longer than the stale threshold.
    pub stale_running: u64,
}

/// Deletes failed and finished jobs once their retention window has passed.
///
/// Running jobs are never deleted; those not modified within the stale
/// threshold are counted and logged. At most one sweep runs at a time.
pub struct CleanupSweeper {
    store: Arc<dyn JobStore>,
    config: CleanupConfig,
    running: Mutex<()>,
}

impl std::fmt::Debug for CleanupSweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanupSweeper")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CleanupSweeper {
    /// Create a sweeper over `store`.
    pub fn new(store: Arc<dyn JobStore>, config: CleanupConfig) -> Self {
        Self {
            store,
            config,
            running: Mutex::new(()),
        }
    }

    /// Run one sweep.
    ///
    /// Returns `Ok(None)` without touching the store when another sweep is
    /// still in progress.
    pub async fn run_sweep(&self) -> AppResult<Option<SweepReport>> {
        let Ok(_guard) = self.running.try_lock() else {
            info!("Previous job cleanup still running, skipping this run");
            return Ok(None);
        };

        let now = Utc::now();
        let failed_cutoff = cutoff(now, self.config.failed_retention()?)?;
        let finished_cutoff = cutoff(now, self.config.success_retention()?)?;
        let stale_cutoff = cutoff(now, self.config.stale_running()?)?;

        let report = SweepReport {
            failed_deleted: self
                .store
                .delete_by_status_older_than(JobStatus::Failed, failed_cutoff)
                .await?,
            finished_deleted: self
                .store
                .delete_by_status_older_than(JobStatus::Finished, finished_cutoff)
                .await?,
            stale_running: self
                .store
                .count_by_status_older_than(JobStatus::Running, stale_cutoff)
                .await?,
        };

        if report.stale_running > 0 {
            warn!(
                count = report.stale_running,
                threshold_hours = self.config.stale_running_hours,
                "Jobs have been running without an update past the stale threshold"
            );
        }
        info!(
            failed_deleted = report.failed_deleted,
            finished_deleted = report.finished_deleted,
            stale_running = report.stale_running,
            "Job cleanup completed"
        );
        Ok(Some(report))
    }

    /// Run one sweep and log, rather than return, any failure.
    pub async fn tick(&self) {
        if let Err(e) = self.run_sweep().await {
            error!(error = %e, "Job cleanup failed");
        }
    }
}

fn cutoff(now: DateTime<Utc>, window: Duration) -> AppResult<DateTime<Utc>> {
    now.checked_sub_signed(window).ok_or_else(|| {
        AppError::configuration(format!("Retention window {window} is out of range"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobhub_core::types::SortAndFilterRequest;
    use jobhub_database::MemoryJobRepository;
    use jobhub_entity::job::Job;

    async fn seed(store: &MemoryJobRepository, status: JobStatus, age: Duration) -> Job {
        let mut job = Job::new("", "encoding").unwrap();
        job.apply_status(status, None);
        job.modified_at = job.modified_at - age;
        store.create(job).await.unwrap()
    }

    fn sweeper(store: &MemoryJobRepository) -> CleanupSweeper {
        CleanupSweeper::new(Arc::new(store.clone()), CleanupConfig::default())
    }

    #[tokio::test]
    async fn test_sweep_purges_only_aged_terminal_jobs() {
        let store = MemoryJobRepository::new();
        seed(&store, JobStatus::Failed, Duration::days(31)).await;
        let recent_failed = seed(&store, JobStatus::Failed, Duration::days(2)).await;
        seed(&store, JobStatus::Finished, Duration::days(8)).await;
        let recent_finished = seed(&store, JobStatus::Finished, Duration::days(1)).await;
        let stale = seed(&store, JobStatus::Running, Duration::hours(30)).await;
        let waiting = seed(&store, JobStatus::Created, Duration::days(90)).await;

        let report = sweeper(&store).run_sweep().await.unwrap().unwrap();
        assert_eq!(
            report,
            SweepReport {
                failed_deleted: 1,
                finished_deleted: 1,
                stale_running: 1,
            }
        );

        let page = store
            .find_all(&SortAndFilterRequest::default())
            .await
            .unwrap();
        let mut remaining: Vec<_> = page.items.iter().map(|j| j.id).collect();
        remaining.sort();
        let mut expected = vec![recent_failed.id, recent_finished.id, stale.id, waiting.id];
        expected.sort();
        assert_eq!(remaining, expected);
    }

    #[tokio::test]
    async fn test_overlapping_sweep_is_skipped() {
        let store = MemoryJobRepository::new();
        seed(&store, JobStatus::Failed, Duration::days(40)).await;
        let sweeper = sweeper(&store);

        let guard = sweeper.running.lock().await;
        assert_eq!(sweeper.run_sweep().await.unwrap(), None);
        drop(guard);

        let report = sweeper.run_sweep().await.unwrap().unwrap();
        assert_eq!(report.failed_deleted, 1);
    }

    #[tokio::test]
    async fn test_oversized_retention_fails_the_sweep_without_deleting() {
        let store = MemoryJobRepository::new();
        seed(&store, JobStatus::Failed, Duration::days(40)).await;
        let config = CleanupConfig {
            failed_retention_days: 1_000_000_000,
            ..CleanupConfig::default()
        };
        let sweeper = CleanupSweeper::new(Arc::new(store.clone()), config);

        let err = sweeper.run_sweep().await.unwrap_err();
        assert_eq!(err.kind, jobhub_core::error::ErrorKind::Configuration);
        sweeper.tick().await;

        let remaining = store
            .count_by_status_older_than(JobStatus::Failed, Utc::now())
            .await
            .unwrap();
        assert_eq!(remaining, 1);
    }

    #[test]
    fn test_cutoff_rejects_windows_past_the_epoch() {
        let now = Utc::now();
        assert_eq!(cutoff(now, Duration::days(1)).unwrap(), now - Duration::days(1));
        assert!(cutoff(DateTime::<Utc>::MIN_UTC, Duration::days(1)).is_err());
    }
}
