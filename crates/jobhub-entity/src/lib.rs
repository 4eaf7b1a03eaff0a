//! # jobhub-entity
//!
//! Domain entity models for JobHub. The [`job::Job`] struct represents a
//! row of the job table and derives `sqlx::FromRow`; the remaining types are
//! value objects around it (status and priority enums, the append-only
//! history, request and response shapes, and the field table used by the
//! query translators).

pub mod job;
