//! Job domain entities.

pub mod field;
pub mod history;
pub mod merge;
pub mod model;
pub mod request;
pub mod response;
pub mod status;

pub use field::{FieldKind, FieldValue, JobField};
pub use history::{HistoryItem, HistoryList};
pub use merge::{merge_job, MergedJob};
pub use model::Job;
pub use request::{CreateJobRequest, UpdateJobRequest};
pub use response::JobResponse;
pub use status::{JobPriority, JobStatus};
