//! The job store contract shared by every backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use jobhub_core::result::AppResult;
use jobhub_core::types::{JobId, PageResponse, SortAndFilterRequest};
use jobhub_entity::job::{Job, JobStatus, UpdateJobRequest};

/// Persistence and queue operations over jobs.
///
/// Implementations are safe to share between tasks behind an
/// `Arc<dyn JobStore>`. Every by-id operation fails with `NotFound` for an
/// unknown id before anything is mutated, and every operation returns
/// owned copies of the stored jobs.
#[async_trait]
pub trait JobStore: Send + Sync + 'static {
    /// Persist a new job and return it as stored.
    async fn create(&self, job: Job) -> AppResult<Job>;

    /// List jobs matching the filters, sorted and paged, with the total
    /// number of matches before paging.
    async fn find_all(&self, request: &SortAndFilterRequest) -> AppResult<PageResponse<Job>>;

    /// Fetch one job.
    async fn find_by_id(&self, id: JobId) -> AppResult<Job>;

    /// Merge a partial update into a job and return the result.
    async fn update(&self, id: JobId, request: &UpdateJobRequest) -> AppResult<Job>;

    /// Remove one job.
    async fn delete_by_id(&self, id: JobId) -> AppResult<()>;

    /// Remove every job, returning how many were removed.
    async fn delete_all(&self) -> AppResult<u64>;

    /// Hand the most urgent `created` job of `job_type` to the caller and
    /// mark it `running`.
    ///
    /// Candidates are ordered by priority, then highest rank, then oldest
    /// creation time, then smallest id. Concurrent callers never receive
    /// the same job. Fails with `NotFound` when nothing is waiting.
    async fn dequeue(&self, job_type: &str) -> AppResult<Job>;

    /// Change the status and record it in the history.
    async fn set_status_by_id(
        &self,
        id: JobId,
        status: JobStatus,
        message: Option<&str>,
    ) -> AppResult<Job>;

    /// Append a free-form history entry.
    async fn set_history_by_id(&self, id: JobId, message: &str) -> AppResult<Job>;

    /// Set the completion percentage (0 to 100). No history entry.
    async fn set_progress_by_id(&self, id: JobId, progress: i32) -> AppResult<Job>;

    /// Delete jobs in `status` last modified before `cutoff`.
    async fn delete_by_status_older_than(
        &self,
        status: JobStatus,
        cutoff: DateTime<Utc>,
    ) -> AppResult<u64>;

    /// Count jobs in `status` last modified before `cutoff`.
    async fn count_by_status_older_than(
        &self,
        status: JobStatus,
        cutoff: DateTime<Utc>,
    ) -> AppResult<u64>;
}

/// Error for an unknown job id.
pub(crate) fn job_not_found(id: JobId) -> jobhub_core::AppError {
    jobhub_core::AppError::not_found(format!("Job with id {id} does not exist"))
}

/// Error for a create whose id is already stored.
pub(crate) fn job_exists(id: JobId) -> jobhub_core::AppError {
    jobhub_core::AppError::conflict(format!("Job with id {id} already exists"))
}

/// Error for a dequeue with no candidate.
pub(crate) fn nothing_to_dequeue(job_type: &str) -> jobhub_core::AppError {
    jobhub_core::AppError::not_found(format!("No job of type {job_type} to dequeue"))
}
