//! Retention and cleanup sweep configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppError;
use crate::result::AppResult;

/// Upper bound for the retention windows, in days.
pub const MAX_RETENTION_DAYS: i64 = 36_500;

/// Upper bound for the trigger interval and stale threshold, in hours.
pub const MAX_HOURS: i64 = 87_600;

/// Retention windows and trigger interval for the cleanup sweeper.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CleanupConfig {
    /// Whether the periodic sweep is scheduled at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Hours between two sweeps.
    #[serde(default = "default_interval_hours")]
    #[validate(range(min = 1, max = 87600))]
    pub interval_hours: u64,
    /// Days a `failed` job is kept after its last modification.
    #[serde(default = "default_failed_retention_days")]
    #[validate(range(min = 1, max = 36500))]
    pub failed_retention_days: i64,
    /// Days a `finished` job is kept after its last modification.
    #[serde(default = "default_success_retention_days")]
    #[validate(range(min = 1, max = 36500))]
    pub success_retention_days: i64,
    /// Hours after which a `running` job is reported as stale.
    #[serde(default = "default_stale_running_hours")]
    #[validate(range(min = 1, max = 87600))]
    pub stale_running_hours: i64,
}

impl CleanupConfig {
    /// Trigger interval as a std duration.
    pub fn interval(&self) -> AppResult<std::time::Duration> {
        if self.interval_hours == 0 || self.interval_hours > MAX_HOURS as u64 {
            return Err(out_of_range("interval_hours", self.interval_hours));
        }
        Ok(std::time::Duration::from_secs(self.interval_hours * 3600))
    }

    /// Retention window for failed jobs.
    pub fn failed_retention(&self) -> AppResult<Duration> {
        days("failed_retention_days", self.failed_retention_days)
    }

    /// Retention window for finished jobs.
    pub fn success_retention(&self) -> AppResult<Duration> {
        days("success_retention_days", self.success_retention_days)
    }

    /// Age at which a running job counts as stale.
    pub fn stale_running(&self) -> AppResult<Duration> {
        if self.stale_running_hours > MAX_HOURS {
            return Err(out_of_range("stale_running_hours", self.stale_running_hours));
        }
        Duration::try_hours(self.stale_running_hours)
            .ok_or_else(|| out_of_range("stale_running_hours", self.stale_running_hours))
    }
}

fn days(field: &str, value: i64) -> AppResult<Duration> {
    if value > MAX_RETENTION_DAYS {
        return Err(out_of_range(field, value));
    }
    Duration::try_days(value).ok_or_else(|| out_of_range(field, value))
}

fn out_of_range(field: &str, value: impl std::fmt::Display) -> AppError {
    AppError::configuration(format!("cleanup.{field} = {value} is out of range"))
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            interval_hours: default_interval_hours(),
            failed_retention_days: default_failed_retention_days(),
            success_retention_days: default_success_retention_days(),
            stale_running_hours: default_stale_running_hours(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_interval_hours() -> u64 {
    1
}

fn default_failed_retention_days() -> i64 {
    30
}

fn default_success_retention_days() -> i64 {
    7
}

fn default_stale_running_hours() -> i64 {
    24
}
