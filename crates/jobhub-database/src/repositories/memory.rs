//! In-memory job store using a Tokio mutex for single-process deployments.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info};

use jobhub_core::result::AppResult;
use jobhub_core::types::{JobId, PageResponse, SortAndFilterRequest};
use jobhub_entity::job::{merge_job, Job, JobStatus, UpdateJobRequest};

use crate::query::JobQuery;
use crate::store::{job_exists, job_not_found, nothing_to_dequeue, JobStore};

/// Job store holding every job in a process-local map.
///
/// Each operation holds the lock for its whole read-modify-write, so
/// concurrent dequeues never hand out the same job. Jobs are lost on
/// restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryJobRepository {
    jobs: Arc<Mutex<HashMap<JobId, Job>>>,
}

impl MemoryJobRepository {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `change` to the stored job under the lock.
    async fn modify<F>(&self, id: JobId, change: F) -> AppResult<Job>
    where
        F: FnOnce(&mut Job) -> AppResult<()> + Send,
    {
        let mut jobs = self.jobs.lock().await;
        let stored = jobs.get_mut(&id).ok_or_else(|| job_not_found(id))?;
        let mut job = stored.clone();
        change(&mut job)?;
        *stored = job.clone();
        Ok(job)
    }
}

#[async_trait]
impl JobStore for MemoryJobRepository {
    async fn create(&self, job: Job) -> AppResult<Job> {
        let mut jobs = self.jobs.lock().await;
        if jobs.contains_key(&job.id) {
            return Err(job_exists(job.id));
        }
        jobs.insert(job.id, job.clone());
        info!(job_id = %job.id, job_type = %job.job_type, "Job created");
        Ok(job)
    }

    async fn find_all(&self, request: &SortAndFilterRequest) -> AppResult<PageResponse<Job>> {
        let query = JobQuery::resolve(request)?;
        let jobs = self.jobs.lock().await;

        let mut matching: Vec<&Job> = jobs.values().filter(|job| query.matches(job)).collect();
        let total = matching.len() as u64;
        matching.sort_by(|a, b| query.compare(a, b));

        let offset = usize::try_from(query.page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.page.limit()).unwrap_or(usize::MAX);
        let items: Vec<Job> = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();

        debug!(total, returned = items.len(), "Listed jobs");
        Ok(PageResponse::new(items, &query.page, total))
    }

    async fn find_by_id(&self, id: JobId) -> AppResult<Job> {
        self.jobs
            .lock()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| job_not_found(id))
    }

    async fn update(&self, id: JobId, request: &UpdateJobRequest) -> AppResult<Job> {
        let mut jobs = self.jobs.lock().await;
        let stored = jobs.get_mut(&id).ok_or_else(|| job_not_found(id))?;
        let merged = merge_job(stored, request)?;
        if merged.is_changed() {
            *stored = merged.job.clone();
            info!(job_id = %id, changed = merged.changes.len(), "Job updated");
        }
        Ok(merged.job)
    }

    async fn delete_by_id(&self, id: JobId) -> AppResult<()> {
        if self.jobs.lock().await.remove(&id).is_none() {
            return Err(job_not_found(id));
        }
        info!(job_id = %id, "Job deleted");
        Ok(())
    }

    async fn delete_all(&self) -> AppResult<u64> {
        let mut jobs = self.jobs.lock().await;
        let deleted = jobs.len() as u64;
        jobs.clear();
        info!(deleted, "All jobs deleted");
        Ok(deleted)
    }

    async fn dequeue(&self, job_type: &str) -> AppResult<Job> {
        let mut jobs = self.jobs.lock().await;
        let id = jobs
            .values()
            .filter(|job| job.is_dequeue_candidate(job_type))
            .min_by(|a, b| Job::dequeue_order(a, b))
            .map(|job| job.id)
            .ok_or_else(|| nothing_to_dequeue(job_type))?;

        let job = jobs.get_mut(&id).ok_or_else(|| job_not_found(id))?;
        job.apply_dequeue();
        info!(job_id = %id, job_type, priority = %job.priority, "Job dequeued");
        Ok(job.clone())
    }

    async fn set_status_by_id(
        &self,
        id: JobId,
        status: JobStatus,
        message: Option<&str>,
    ) -> AppResult<Job> {
        let job = self
            .modify(id, |job| {
                job.apply_status(status, message);
                Ok(())
            })
            .await?;
        info!(job_id = %id, status = %status, "Job status changed");
        Ok(job)
    }

    async fn set_history_by_id(&self, id: JobId, message: &str) -> AppResult<Job> {
        self.modify(id, |job| {
            job.apply_history(message);
            Ok(())
        })
        .await
    }

    async fn set_progress_by_id(&self, id: JobId, progress: i32) -> AppResult<Job> {
        self.modify(id, |job| job.apply_progress(progress)).await
    }

    async fn delete_by_status_older_than(
        &self,
        status: JobStatus,
        cutoff: DateTime<Utc>,
    ) -> AppResult<u64> {
        let mut jobs = self.jobs.lock().await;
        let before = jobs.len();
        jobs.retain(|_, job| !(job.status == status && job.modified_at < cutoff));
        Ok((before - jobs.len()) as u64)
    }

    async fn count_by_status_older_than(
        &self,
        status: JobStatus,
        cutoff: DateTime<Utc>,
    ) -> AppResult<u64> {
        let jobs = self.jobs.lock().await;
        let count = jobs
            .values()
            .filter(|job| job.status == status && job.modified_at < cutoff)
            .count();
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobhub_core::error::ErrorKind;
    use jobhub_core::types::{FilterField, FilterOp, PageRequest, SortField};
    use jobhub_entity::job::{CreateJobRequest, JobPriority};

    async fn create(store: &MemoryJobRepository, name: &str, priority: &str) -> Job {
        let request = CreateJobRequest {
            name: Some(name.to_string()),
            job_type: Some("encoding".to_string()),
            priority: Some(priority.to_string()),
            ..Default::default()
        };
        store.create(Job::from_request(&request).unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_id_is_a_conflict() {
        let store = MemoryJobRepository::new();
        let job = create(&store, "first", "").await;

        let err = store.create(job.clone()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert_eq!(store.find_by_id(job.id).await.unwrap(), job);
    }

    #[tokio::test]
    async fn test_dequeue_flips_to_running_once() {
        let store = MemoryJobRepository::new();
        let job = store
            .create(Job::new("", "encoding").unwrap())
            .await
            .unwrap();
        assert_eq!(job.priority, JobPriority::Medium);

        let dequeued = store.dequeue("encoding").await.unwrap();
        assert_eq!(dequeued.id, job.id);
        assert_eq!(dequeued.status, JobStatus::Running);
        assert_eq!(dequeued.history.last().unwrap().message, "Job dequeued");

        let err = store.dequeue("encoding").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_dequeue_prefers_priority_over_age() {
        let store = MemoryJobRepository::new();
        create(&store, "low", "low").await;
        let high = create(&store, "high", "high").await;

        assert_eq!(store.dequeue("encoding").await.unwrap().id, high.id);
        assert_eq!(store.dequeue("encoding").await.unwrap().name, "low");
    }

    #[tokio::test]
    async fn test_dequeue_ignores_other_types_and_statuses() {
        let store = MemoryJobRepository::new();
        let paused = create(&store, "paused", "realtime").await;
        store
            .set_status_by_id(paused.id, JobStatus::Paused, None)
            .await
            .unwrap();
        store
            .create(Job::new("other", "thumbnail").unwrap())
            .await
            .unwrap();

        let err = store.dequeue("encoding").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_concurrent_dequeue_hands_each_job_out_once() {
        let store = MemoryJobRepository::new();
        for i in 0..20 {
            create(&store, &format!("job-{i}"), "medium").await;
        }

        let mut handles = Vec::new();
        for _ in 0..40 {
            let store = store.clone();
            handles.push(tokio::spawn(async move { store.dequeue("encoding").await }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            if let Ok(job) = handle.await.unwrap() {
                ids.push(job.id);
            }
        }
        assert_eq!(ids.len(), 20);
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 20);
    }

    #[tokio::test]
    async fn test_find_all_filters_and_counts() {
        let store = MemoryJobRepository::new();
        for i in 0..5 {
            let job = create(&store, &format!("job-{i}"), "medium").await;
            if i % 2 == 0 {
                store
                    .set_status_by_id(job.id, JobStatus::Running, None)
                    .await
                    .unwrap();
            }
        }

        let request = SortAndFilterRequest::default()
            .with_filter(FilterField::eq("status", "running"))
            .with_sort(SortField::asc("name"))
            .with_page(PageRequest::new(2, 0));
        let page = store.find_all(&request).await.unwrap();
        assert_eq!(page.total_count, 3);
        assert_eq!(page.items.len(), 2);
        assert!(page.items.iter().all(|j| j.status == JobStatus::Running));
        assert_eq!(page.items[0].name, "job-0");
        assert_eq!(page.items[1].name, "job-2");

        let request = request
            .with_filter(FilterField::new("name", FilterOp::EndsWith, "4"))
            .with_page(PageRequest::default());
        let page = store.find_all(&request).await.unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.items[0].name, "job-4");
    }

    #[tokio::test]
    async fn test_delete_all_then_find_all_is_empty() {
        let store = MemoryJobRepository::new();
        create(&store, "a", "").await;
        create(&store, "b", "").await;
        assert_eq!(store.delete_all().await.unwrap(), 2);

        let page = store
            .find_all(&SortAndFilterRequest::default())
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total_count, 0);
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let store = MemoryJobRepository::new();
        let id = JobId::new();
        assert!(store.find_by_id(id).await.unwrap_err().is_not_found());
        assert!(store.delete_by_id(id).await.unwrap_err().is_not_found());
        assert!(store
            .set_history_by_id(id, "hello")
            .await
            .unwrap_err()
            .is_not_found());
        assert!(store
            .update(id, &UpdateJobRequest::default())
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_update_and_history() {
        let store = MemoryJobRepository::new();
        let job = create(&store, "a", "").await;

        let request = UpdateJobRequest {
            destination: Some("out".to_string()),
            priority: Some("bogus".to_string()),
            ..Default::default()
        };
        assert_eq!(
            store.update(job.id, &request).await.unwrap_err().kind,
            ErrorKind::Validation
        );
        assert_eq!(store.find_by_id(job.id).await.unwrap(), job);

        let request = UpdateJobRequest {
            destination: Some("out".to_string()),
            ..Default::default()
        };
        let updated = store.update(job.id, &request).await.unwrap();
        assert_eq!(updated.destination, "out");
        assert_eq!(
            updated.history.last().unwrap().message,
            "Job data changed. New Data: destination: out"
        );

        let annotated = store.set_history_by_id(job.id, "checkpoint").await.unwrap();
        assert_eq!(annotated.history.len(), 3);
        assert_eq!(store.find_by_id(job.id).await.unwrap(), annotated);
    }

    #[tokio::test]
    async fn test_progress_range() {
        let store = MemoryJobRepository::new();
        let job = create(&store, "a", "").await;
        assert_eq!(store.set_progress_by_id(job.id, 80).await.unwrap().progress, 80);
        assert_eq!(
            store.set_progress_by_id(job.id, 120).await.unwrap_err().kind,
            ErrorKind::Validation
        );
        assert_eq!(store.find_by_id(job.id).await.unwrap().progress, 80);
    }

    #[tokio::test]
    async fn test_aged_jobs_by_status() {
        let store = MemoryJobRepository::new();
        let old = create(&store, "old", "").await;
        store
            .set_status_by_id(old.id, JobStatus::Failed, Some("boom"))
            .await
            .unwrap();
        let fresh = create(&store, "fresh", "").await;
        store
            .set_status_by_id(fresh.id, JobStatus::Failed, None)
            .await
            .unwrap();

        let cutoff = Utc::now() + chrono::Duration::seconds(1);
        assert_eq!(
            store
                .count_by_status_older_than(JobStatus::Failed, cutoff)
                .await
                .unwrap(),
            2
        );
        let past = Utc::now() - chrono::Duration::days(1);
        assert_eq!(
            store
                .delete_by_status_older_than(JobStatus::Failed, past)
                .await
                .unwrap(),
            0
        );
        assert_eq!(
            store
                .delete_by_status_older_than(JobStatus::Failed, cutoff)
                .await
                .unwrap(),
            2
        );
    }
}
