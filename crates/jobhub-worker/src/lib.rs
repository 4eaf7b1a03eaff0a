//! Scheduled maintenance for JobHub.
//!
//! The store itself runs no background threads. This crate adds the one
//! periodic task the service needs: the retention sweep, triggered on a
//! fixed interval by [`CronScheduler`].

pub mod jobs;
pub mod scheduler;

pub use jobs::{CleanupSweeper, SweepReport};
pub use scheduler::CronScheduler;
