//! Payloads for the job operations that are not plain create/update.

use serde::{Deserialize, Serialize};

/// Ask for the next waiting job of a type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DequeueRequest {
    #[serde(rename = "type")]
    pub job_type: Option<String>,
}

/// Change a job's status, optionally with a note for the history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateJobStatusRequest {
    pub status: Option<String>,
    pub message: Option<String>,
}

/// Append a free-form history entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateJobHistoryRequest {
    pub message: Option<String>,
}

/// Report completion percentage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateJobProgressRequest {
    pub progress: Option<i32>,
}
