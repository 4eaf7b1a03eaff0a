//! Job use cases.

pub mod dto;
pub mod query;
pub mod service;

pub use dto::{DequeueRequest, UpdateJobHistoryRequest, UpdateJobProgressRequest, UpdateJobStatusRequest};
pub use query::parse_list_params;
pub use service::JobService;
