//! Core type definitions used across the JobHub workspace.

pub mod filter;
pub mod id;
pub mod pagination;
pub mod query;
pub mod sorting;

pub use filter::{FilterField, FilterOp, FilterValue};
pub use id::JobId;
pub use pagination::{PageRequest, PageResponse};
pub use query::SortAndFilterRequest;
pub use sorting::{SortDirection, SortField};
