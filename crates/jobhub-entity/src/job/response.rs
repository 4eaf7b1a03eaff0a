//! Serializable job projection handed to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::history::HistoryItem;
use super::model::Job;

/// Plain-field view of a [`Job`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResponse {
    pub id: String,
    pub correlation_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub modified_at: DateTime<Utc>,
    pub modified_by: String,
    pub status: String,
    pub source: String,
    pub destination: String,
    #[serde(rename = "type")]
    pub job_type: String,
    pub sub_type: String,
    pub action: String,
    pub action_details: String,
    pub progress: i32,
    /// History flattened to one line per entry.
    pub history: String,
    /// History as structured records.
    pub history_entries: Vec<HistoryItem>,
    pub extra_data: String,
    pub priority: String,
    pub rank: i32,
}

impl From<&Job> for JobResponse {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id.to_string(),
            correlation_id: job.correlation_id.clone(),
            name: job.name.clone(),
            created_at: job.created_at,
            created_by: job.created_by.clone(),
            modified_at: job.modified_at,
            modified_by: job.modified_by.clone(),
            status: job.status.to_string(),
            source: job.source.clone(),
            destination: job.destination.clone(),
            job_type: job.job_type.clone(),
            sub_type: job.sub_type.clone(),
            action: job.action.clone(),
            action_details: job.action_details.clone(),
            progress: job.progress,
            history: job.history.to_text(),
            history_entries: job.history.entries().to_vec(),
            extra_data: job.extra_data.clone(),
            priority: job.priority.to_string(),
            rank: job.rank,
        }
    }
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self::from(&job)
    }
}
