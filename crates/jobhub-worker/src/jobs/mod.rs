//! Periodic maintenance tasks.

pub mod cleanup;

pub use cleanup::{CleanupSweeper, SweepReport};
