//! # jobhub-service
//!
//! Use-case layer between a request handler and the job store. The
//! [`JobService`] validates incoming payloads, builds new jobs, projects
//! stored jobs into [`JobResponse`](jobhub_entity::job::JobResponse)s and
//! turns raw query parameters into a sort/filter/page request.
//!
//! The store is injected at construction as an `Arc<dyn JobStore>`.

pub mod job;

pub use job::JobService;
