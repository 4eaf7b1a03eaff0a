//! End-to-end job lifecycle over the in-memory store.

use std::sync::Arc;

use chrono::Duration;

use jobhub_core::config::CleanupConfig;
use jobhub_core::error::ErrorKind;
use jobhub_core::types::JobId;
use jobhub_database::{JobStore, MemoryJobRepository};
use jobhub_entity::job::{CreateJobRequest, UpdateJobRequest};
use jobhub_service::JobService;
use jobhub_service::job::{DequeueRequest, UpdateJobProgressRequest, UpdateJobStatusRequest};
use jobhub_worker::CleanupSweeper;

/// Service, store and sweeper sharing one in-memory job list.
struct TestApp {
    store: MemoryJobRepository,
    service: JobService,
    sweeper: CleanupSweeper,
}

impl TestApp {
    fn new() -> Self {
        let store = MemoryJobRepository::new();
        let shared: Arc<dyn JobStore> = Arc::new(store.clone());
        Self {
            service: JobService::new(Arc::clone(&shared), 100),
            sweeper: CleanupSweeper::new(shared, CleanupConfig::default()),
            store,
        }
    }

    async fn submit(&self, name: &str, priority: &str, rank: i64) -> String {
        let request = CreateJobRequest {
            name: Some(name.to_string()),
            priority: Some(priority.to_string()),
            rank: Some(rank),
            created_by: Some("encoder-frontend".to_string()),
            ..CreateJobRequest::with_type("encoding")
        };
        self.service.create_job(&request).await.unwrap().id
    }

    async fn backdate(&self, id: &str, age: Duration) {
        let id: JobId = id.parse().unwrap();
        let mut job = self.store.find_by_id(id).await.unwrap();
        job.modified_at = job.modified_at - age;
        self.store.delete_by_id(id).await.unwrap();
        self.store.create(job).await.unwrap();
    }
}

#[tokio::test]
async fn test_jobs_are_handed_out_by_priority_then_rank() {
    let app = TestApp::new();
    let low = app.submit("low", "low", 0).await;
    let high = app.submit("high", "high", 0).await;
    let high_ranked = app.submit("high ranked", "high", 5).await;
    let medium = app.submit("medium", "", 0).await;

    let request = DequeueRequest {
        job_type: Some("encoding".to_string()),
    };
    let mut order = Vec::new();
    for _ in 0..4 {
        order.push(app.service.dequeue(&request).await.unwrap().id);
    }
    assert_eq!(order, vec![high_ranked, high, medium, low]);

    let err = app.service.dequeue(&request).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let running = app.service.list_jobs(&[("status", "running")]).await.unwrap();
    assert_eq!(running.total_count, 4);
}

#[tokio::test]
async fn test_worker_reports_progress_and_completion() {
    let app = TestApp::new();
    let id = app.submit("clip.mp4", "medium", 0).await;

    let update = UpdateJobRequest {
        destination: Some("s3://out/clip.webm".to_string()),
        modified_by: Some("worker-7".to_string()),
        ..Default::default()
    };
    let updated = app.service.update_job(&id, &update).await.unwrap();
    assert_eq!(updated.modified_by, "worker-7");
    assert!(
        updated
            .history
            .contains("Job data changed. New Data: destination: s3://out/clip.webm")
    );

    let progress = UpdateJobProgressRequest { progress: Some(60) };
    assert_eq!(app.service.set_progress(&id, &progress).await.unwrap().progress, 60);

    let status = UpdateJobStatusRequest {
        status: Some("finished".to_string()),
        message: None,
    };
    let finished = app.service.set_status(&id, &status).await.unwrap();
    assert_eq!(finished.status, "finished");

    let page = app
        .service
        .list_jobs(&[("name", "ew:.mp4"), ("status", "neq:running")])
        .await
        .unwrap();
    assert_eq!(page.total_count, 1);
    assert_eq!(page.items[0].id, id);
}

#[tokio::test]
async fn test_sweep_removes_expired_jobs_only() {
    let app = TestApp::new();
    let old = app.submit("old", "low", 0).await;
    let fresh = app.submit("fresh", "low", 0).await;

    let finished = UpdateJobStatusRequest {
        status: Some("finished".to_string()),
        message: None,
    };
    app.service.set_status(&old, &finished).await.unwrap();
    app.service.set_status(&fresh, &finished).await.unwrap();
    app.backdate(&old, Duration::days(10)).await;

    let report = app.sweeper.run_sweep().await.unwrap().unwrap();
    assert_eq!(report.finished_deleted, 1);
    assert_eq!(report.failed_deleted, 0);

    let err = app.service.get_job(&old).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(app.service.get_job(&fresh).await.unwrap().name, "fresh");
}
