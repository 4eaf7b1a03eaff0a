//! Partial-update merge with a single consolidated audit entry.

use jobhub_core::result::AppResult;

use super::model::{now, Job};
use super::request::{normalize_rank, present, UpdateJobRequest};
use super::status::JobPriority;

/// Prefix of the history entry recorded for a data change.
pub const DATA_CHANGED_PREFIX: &str = "Job data changed. New Data: ";

/// Outcome of merging an update into a job.
#[derive(Debug, Clone)]
pub struct MergedJob {
    /// The job after the merge.
    pub job: Job,
    /// `(field, new value)` pairs that changed, in field order.
    pub changes: Vec<(&'static str, String)>,
}

impl MergedJob {
    /// Whether the update changed anything.
    pub fn is_changed(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// Merge `request` into a copy of `old`.
///
/// Present, non-blank strings and a positive rank override the stored value.
/// Status, creation metadata, progress and history are carried over. When
/// anything changed, `modified_at` is refreshed, `modified_by` is taken from
/// the request and one `Job data changed` entry lists the changes. An
/// unknown priority fails before anything is touched.
pub fn merge_job(old: &Job, request: &UpdateJobRequest) -> AppResult<MergedJob> {
    let priority = match present(&request.priority) {
        Some(name) => Some(name.parse::<JobPriority>()?),
        None => None,
    };

    let mut job = old.clone();
    let mut changes = Vec::new();

    let mut text = |name: &'static str, target: &mut String, value: &Option<String>| {
        if let Some(value) = present(value) {
            if target != value {
                *target = value.to_string();
                changes.push((name, value.to_string()));
            }
        }
    };
    text("correlation_id", &mut job.correlation_id, &request.correlation_id);
    text("name", &mut job.name, &request.name);
    text("source", &mut job.source, &request.source);
    text("destination", &mut job.destination, &request.destination);
    text("type", &mut job.job_type, &request.job_type);
    text("sub_type", &mut job.sub_type, &request.sub_type);
    text("action", &mut job.action, &request.action);
    text("action_details", &mut job.action_details, &request.action_details);
    text("extra_data", &mut job.extra_data, &request.extra_data);

    if let Some(priority) = priority.filter(|p| *p != job.priority) {
        job.priority = priority;
        changes.push(("priority", priority.to_string()));
    }

    let rank = request.rank.map(normalize_rank).unwrap_or(0);
    if rank != 0 && rank != job.rank {
        job.rank = rank;
        changes.push(("rank", rank.to_string()));
    }

    if !changes.is_empty() {
        job.modified_at = now();
        if let Some(actor) = present(&request.modified_by) {
            job.modified_by = actor.to_string();
        }
        job.history.add(job.modified_at, describe_changes(&changes));
    }

    Ok(MergedJob { job, changes })
}

fn describe_changes(changes: &[(&'static str, String)]) -> String {
    let fields: Vec<String> = changes
        .iter()
        .map(|(field, value)| format!("{field}: {value}"))
        .collect();
    format!("{DATA_CHANGED_PREFIX}{}", fields.join("; "))
}
