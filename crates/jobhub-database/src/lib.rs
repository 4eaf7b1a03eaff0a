//! # jobhub-database
//!
//! The [`JobStore`] contract and its two implementations: a PostgreSQL
//! table ([`PgJobRepository`]) and a process-local map
//! ([`MemoryJobRepository`]). Also hosts the connection pool, the schema
//! bootstrap and the sort/filter translator both stores share.

pub mod connection;
pub mod migration;
pub mod query;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use repositories::{MemoryJobRepository, PgJobRepository};
pub use store::JobStore;
