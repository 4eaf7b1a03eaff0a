//! Job entity model.

use std::cmp::Ordering;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use jobhub_core::error::AppError;
use jobhub_core::result::AppResult;
use jobhub_core::types::JobId;

use super::history::HistoryList;
use super::request::{normalize_rank, present, CreateJobRequest};
use super::status::{JobPriority, JobStatus};

/// History message recorded when a job is created.
pub const CREATED_MESSAGE: &str = "Job created";
/// History message recorded when a job is handed to a worker.
pub const DEQUEUED_MESSAGE: &str = "Job dequeued";

/// Current time at the precision PostgreSQL stores.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// A tracked unit of externally executed work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Job {
    /// Unique, time-sortable identifier.
    pub id: JobId,
    /// Caller-supplied correlation id (opaque).
    pub correlation_id: String,
    /// Display name.
    pub name: String,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// Actor that created the job.
    pub created_by: String,
    /// When the job was last changed.
    pub modified_at: DateTime<Utc>,
    /// Actor that last changed the job.
    pub modified_by: String,
    /// Current status.
    pub status: JobStatus,
    /// Where the work reads from (opaque).
    pub source: String,
    /// Where the work writes to (opaque).
    pub destination: String,
    /// Job type; dequeue selects on it.
    pub job_type: String,
    /// Caller-defined sub type.
    pub sub_type: String,
    /// Caller-defined action.
    pub action: String,
    /// Caller-defined action parameters.
    pub action_details: String,
    /// Completion percentage, 0 to 100.
    pub progress: i32,
    /// Append-only audit trail.
    #[sqlx(json)]
    pub history: HistoryList,
    /// Free-form caller data.
    pub extra_data: String,
    /// Dequeue priority.
    pub priority: JobPriority,
    /// Tie-break weight among equal priorities; higher goes first.
    pub rank: i32,
}

impl Job {
    /// Create a job of the given type with every optional field empty.
    ///
    /// A blank name is replaced by `new job @ <timestamp>`.
    pub fn new(name: &str, job_type: &str) -> AppResult<Self> {
        let job_type = job_type.trim();
        if job_type.is_empty() {
            return Err(AppError::validation("Job must have a type"));
        }

        let created_at = now();
        let name = match name.trim() {
            "" => format!("new job @ {}", created_at.format("%Y-%m-%d %H:%M:%S")),
            name => name.to_string(),
        };

        let mut history = HistoryList::new();
        history.add(created_at, CREATED_MESSAGE);

        Ok(Self {
            id: JobId::new(),
            correlation_id: String::new(),
            name,
            created_at,
            created_by: String::new(),
            modified_at: created_at,
            modified_by: String::new(),
            status: JobStatus::Created,
            source: String::new(),
            destination: String::new(),
            job_type: job_type.to_string(),
            sub_type: String::new(),
            action: String::new(),
            action_details: String::new(),
            progress: 0,
            history,
            extra_data: String::new(),
            priority: JobPriority::default(),
            rank: 0,
        })
    }

    /// Build a new job from a create request.
    ///
    /// Fails with a validation error on a blank type or an unknown priority.
    pub fn from_request(request: &CreateJobRequest) -> AppResult<Self> {
        let priority = JobPriority::parse_or_default(request.priority.as_deref())?;
        let mut job = Self::new(
            request.name.as_deref().unwrap_or_default(),
            request.job_type.as_deref().unwrap_or_default(),
        )?;

        let text = |value: &Option<String>| present(value).unwrap_or_default().to_string();
        job.correlation_id = text(&request.correlation_id);
        job.created_by = text(&request.created_by);
        job.modified_by = job.created_by.clone();
        job.source = text(&request.source);
        job.destination = text(&request.destination);
        job.sub_type = text(&request.sub_type);
        job.action = text(&request.action);
        job.action_details = text(&request.action_details);
        job.extra_data = text(&request.extra_data);
        job.priority = priority;
        job.rank = request.rank.map(normalize_rank).unwrap_or(0);
        Ok(job)
    }

    /// Record a status change with its history entry.
    pub fn apply_status(&mut self, status: JobStatus, message: Option<&str>) {
        let entry = match message.map(str::trim) {
            Some(message) if !message.is_empty() => {
                format!("Job status changed. New status: {status}; {message}")
            }
            _ => format!("Job status changed. New status: {status}"),
        };
        self.status = status;
        self.touch();
        self.history.add(self.modified_at, entry);
    }

    /// Hand the job to a worker: flip to `running` and record the dequeue.
    pub fn apply_dequeue(&mut self) {
        self.status = JobStatus::Running;
        self.touch();
        self.history.add(self.modified_at, DEQUEUED_MESSAGE);
    }

    /// Append a free-form history message.
    pub fn apply_history(&mut self, message: &str) {
        self.touch();
        self.history.add(self.modified_at, message.trim());
    }

    /// Set the completion percentage.
    pub fn apply_progress(&mut self, progress: i32) -> AppResult<()> {
        if !(0..=100).contains(&progress) {
            return Err(AppError::validation(format!(
                "Progress {progress} out of range. Must be between 0 and 100"
            )));
        }
        self.progress = progress;
        self.touch();
        Ok(())
    }

    /// Whether a dequeue of `job_type` may hand out this job.
    pub fn is_dequeue_candidate(&self, job_type: &str) -> bool {
        self.status == JobStatus::Created && self.job_type == job_type
    }

    /// The order in which dequeue hands out candidates.
    ///
    /// Most urgent priority first, then highest rank, then oldest, then
    /// smallest id. Both store backends select with this order.
    pub fn dequeue_order(a: &Job, b: &Job) -> Ordering {
        a.priority
            .index()
            .cmp(&b.priority.index())
            .then_with(|| b.rank.cmp(&a.rank))
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    }

    fn touch(&mut self) {
        self.modified_at = now();
    }
}
