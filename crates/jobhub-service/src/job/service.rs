//! Job service: request validation, job construction and projection.

use std::sync::Arc;

use tracing::{debug, info};

use jobhub_core::error::AppError;
use jobhub_core::result::AppResult;
use jobhub_core::types::{JobId, PageResponse, SortAndFilterRequest};
use jobhub_database::JobStore;
use jobhub_entity::job::request::present;
use jobhub_entity::job::{
    CreateJobRequest, Job, JobPriority, JobResponse, JobStatus, UpdateJobRequest,
};

use super::dto::{
    DequeueRequest, UpdateJobHistoryRequest, UpdateJobProgressRequest, UpdateJobStatusRequest,
};
use super::query::parse_list_params;

/// Validates job requests and forwards them to the store.
#[derive(Clone)]
pub struct JobService {
    store: Arc<dyn JobStore>,
    max_result_limit: u64,
}

impl std::fmt::Debug for JobService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobService")
            .field("max_result_limit", &self.max_result_limit)
            .finish_non_exhaustive()
    }
}

impl JobService {
    /// Creates a new job service.
    pub fn new(store: Arc<dyn JobStore>, max_result_limit: u64) -> Self {
        Self {
            store,
            max_result_limit: max_result_limit.max(1),
        }
    }

    /// Creates a job from a request. Only the type is required.
    pub async fn create_job(&self, request: &CreateJobRequest) -> AppResult<JobResponse> {
        if present(&request.job_type).is_none() {
            return Err(AppError::validation(
                "Job create / update request must have a type",
            ));
        }
        let job = self.store.create(Job::from_request(request)?).await?;
        Ok(JobResponse::from(&job))
    }

    /// Lists jobs using raw query parameters.
    pub async fn list_jobs<K, V>(&self, params: &[(K, V)]) -> AppResult<PageResponse<JobResponse>>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let request = parse_list_params(params, self.max_result_limit)?;
        self.find_jobs(&request).await
    }

    /// Lists jobs using an already parsed request.
    pub async fn find_jobs(
        &self,
        request: &SortAndFilterRequest,
    ) -> AppResult<PageResponse<JobResponse>> {
        if request.page.limit() > self.max_result_limit {
            return Err(AppError::validation(format!(
                "Limit was set to {} (too high). Must be between 1 and {}",
                request.page.limit(),
                self.max_result_limit
            )));
        }
        let page = self.store.find_all(request).await?;
        debug!(total = page.total_count, "Jobs listed");
        Ok(page.map(JobResponse::from))
    }

    /// Gets one job.
    pub async fn get_job(&self, id: &str) -> AppResult<JobResponse> {
        let job = self.store.find_by_id(parse_id(id)?).await?;
        Ok(JobResponse::from(&job))
    }

    /// Applies a partial update.
    pub async fn update_job(&self, id: &str, request: &UpdateJobRequest) -> AppResult<JobResponse> {
        let id = parse_id(id)?;
        JobPriority::parse_or_default(request.priority.as_deref())?;
        let job = self.store.update(id, request).await?;
        Ok(JobResponse::from(&job))
    }

    /// Deletes one job.
    pub async fn delete_job(&self, id: &str) -> AppResult<()> {
        self.store.delete_by_id(parse_id(id)?).await
    }

    /// Deletes every job.
    pub async fn delete_all_jobs(&self) -> AppResult<u64> {
        let deleted = self.store.delete_all().await?;
        info!(deleted, "Job list cleared");
        Ok(deleted)
    }

    /// Hands out the next waiting job of the requested type.
    pub async fn dequeue(&self, request: &DequeueRequest) -> AppResult<JobResponse> {
        let job_type = present(&request.job_type)
            .ok_or_else(|| AppError::validation("Dequeue request must have a type"))?;
        let job = self.store.dequeue(job_type).await?;
        Ok(JobResponse::from(&job))
    }

    /// Changes a job's status.
    pub async fn set_status(
        &self,
        id: &str,
        request: &UpdateJobStatusRequest,
    ) -> AppResult<JobResponse> {
        let id = parse_id(id)?;
        let status = present(&request.status)
            .ok_or_else(|| AppError::validation("Update status request must have a status"))?;
        let status: JobStatus = status.parse().map_err(|_| {
            AppError::validation(format!("Wrong status value {status} when updating job status"))
        })?;
        let job = self
            .store
            .set_status_by_id(id, status, present(&request.message))
            .await?;
        Ok(JobResponse::from(&job))
    }

    /// Appends a history entry.
    pub async fn add_history(
        &self,
        id: &str,
        request: &UpdateJobHistoryRequest,
    ) -> AppResult<JobResponse> {
        let id = parse_id(id)?;
        let message = present(&request.message)
            .ok_or_else(|| AppError::validation("Update history request must have a message"))?;
        let job = self.store.set_history_by_id(id, message).await?;
        Ok(JobResponse::from(&job))
    }

    /// Records completion percentage.
    pub async fn set_progress(
        &self,
        id: &str,
        request: &UpdateJobProgressRequest,
    ) -> AppResult<JobResponse> {
        let id = parse_id(id)?;
        let progress = request
            .progress
            .filter(|p| (0..=100).contains(p))
            .ok_or_else(|| {
                AppError::validation("Update progress request must have a progress between 0 and 100")
            })?;
        let job = self.store.set_progress_by_id(id, progress).await?;
        Ok(JobResponse::from(&job))
    }
}

fn parse_id(id: &str) -> AppResult<JobId> {
    id.parse()
        .map_err(|_| AppError::validation(format!("Job id {id} is not valid")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobhub_core::error::ErrorKind;
    use jobhub_database::MemoryJobRepository;

    fn service() -> JobService {
        JobService::new(Arc::new(MemoryJobRepository::new()), 50)
    }

    fn create_request(job_type: &str, priority: &str) -> CreateJobRequest {
        CreateJobRequest {
            job_type: Some(job_type.to_string()),
            priority: Some(priority.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_requires_type() {
        let service = service();
        let err = service
            .create_job(&CreateJobRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let err = service
            .create_job(&create_request("encoding", "urgent"))
            .await
            .unwrap_err();
        assert_eq!(err.message, "Priority value urgent does not exist");
    }

    #[tokio::test]
    async fn test_encoding_scenario() {
        let service = service();
        let created = service
            .create_job(&create_request("encoding", ""))
            .await
            .unwrap();
        assert_eq!(created.priority, "medium");
        assert_eq!(created.status, "created");

        let request = DequeueRequest {
            job_type: Some("encoding".to_string()),
        };
        let dequeued = service.dequeue(&request).await.unwrap();
        assert_eq!(dequeued.id, created.id);
        assert_eq!(dequeued.status, "running");

        let err = service.dequeue(&request).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_list_jobs_from_params() {
        let service = service();
        for priority in ["high", "low", "high"] {
            service
                .create_job(&create_request("encoding", priority))
                .await
                .unwrap();
        }

        let page = service
            .list_jobs(&[("priority", "high"), ("limit", "1"), ("colour", "red")])
            .await
            .unwrap();
        assert_eq!(page.total_count, 2);
        assert_eq!(page.items.len(), 1);
        assert!(page.has_more());

        let err = service.list_jobs(&[("limit", "51")]).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_status_history_and_progress() {
        let service = service();
        let job = service
            .create_job(&create_request("encoding", ""))
            .await
            .unwrap();

        let err = service
            .set_status(&job.id, &UpdateJobStatusRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let status = UpdateJobStatusRequest {
            status: Some("FINISHED".to_string()),
            message: Some("done".to_string()),
        };
        let finished = service.set_status(&job.id, &status).await.unwrap();
        assert_eq!(finished.status, "finished");
        assert!(finished
            .history
            .contains("Job status changed. New status: finished; done"));

        let history = UpdateJobHistoryRequest {
            message: Some("archived".to_string()),
        };
        let annotated = service.add_history(&job.id, &history).await.unwrap();
        assert_eq!(annotated.history_entries.len(), 3);

        let progress = UpdateJobProgressRequest { progress: Some(101) };
        assert!(service.set_progress(&job.id, &progress).await.is_err());
        let progress = UpdateJobProgressRequest { progress: Some(100) };
        assert_eq!(
            service.set_progress(&job.id, &progress).await.unwrap().progress,
            100
        );
    }

    #[tokio::test]
    async fn test_invalid_and_unknown_ids() {
        let service = service();
        let err = service.get_job("not-a-uuid").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let err = service.get_job(&JobId::new().to_string()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let service = service();
        let job = service
            .create_job(&create_request("encoding", ""))
            .await
            .unwrap();

        let bad = UpdateJobRequest {
            priority: Some("soon".to_string()),
            ..Default::default()
        };
        assert!(service.update_job(&job.id, &bad).await.is_err());

        let update = UpdateJobRequest {
            name: Some("renamed".to_string()),
            ..Default::default()
        };
        assert_eq!(
            service.update_job(&job.id, &update).await.unwrap().name,
            "renamed"
        );

        service.delete_job(&job.id).await.unwrap();
        assert_eq!(service.delete_all_jobs().await.unwrap(), 0);
    }
}
