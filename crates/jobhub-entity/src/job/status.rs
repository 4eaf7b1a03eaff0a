//! Job status and priority enumerations.
//!
//! Status is persisted as its lowercase name in a `TEXT` column. Priority
//! is persisted as its index in a `SMALLINT` column so that ascending
//! order is most-urgent-first.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use jobhub_core::error::AppError;

/// Status of a tracked job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Recorded, waiting to be dequeued. The only valid initial status.
    Created,
    /// Placed in an external queue.
    Queued,
    /// Handed to a worker.
    Running,
    /// Temporarily halted by the worker.
    Paused,
    /// Successfully completed.
    Finished,
    /// Ended with an error.
    Failed,
}

impl JobStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [JobStatus; 6] = [
        Self::Created,
        Self::Queued,
        Self::Running,
        Self::Paused,
        Self::Finished,
        Self::Failed,
    ];

    /// Check if the job is in a terminal state.
    ///
    /// Terminal jobs are the ones the retention sweeper may purge. No
    /// transition is rejected on this basis.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Finished => "finished",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == name)
            .ok_or_else(|| AppError::validation(format!("Status value {s} does not exist")))
    }
}

impl sqlx::Type<sqlx::Postgres> for JobStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <&str as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <&str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for JobStatus {
    fn encode_by_ref(
        &self,
        buf: &mut <sqlx::Postgres as sqlx::Database>::ArgumentBuffer<'q>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for JobStatus {
    fn decode(
        value: <sqlx::Postgres as sqlx::Database>::ValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let name = <&str as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
        Ok(name.parse()?)
    }
}

/// Priority level for a job, most urgent first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JobPriority {
    /// Dequeued before everything else.
    Realtime,
    /// High priority.
    High,
    /// Normal priority (default).
    #[default]
    Medium,
    /// Low priority.
    Low,
    /// Only dequeued when nothing else of the type is waiting.
    Idle,
}

impl JobPriority {
    /// Ordering table: position in this array is the priority index.
    pub const ALL: [JobPriority; 5] = [
        Self::Realtime,
        Self::High,
        Self::Medium,
        Self::Low,
        Self::Idle,
    ];

    /// Return the priority index (lower = more urgent).
    pub const fn index(&self) -> i16 {
        match self {
            Self::Realtime => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
            Self::Idle => 4,
        }
    }

    /// Resolve a priority index back to its member.
    pub fn from_index(index: i64) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    /// Resolve an optional caller-supplied name; blank means the default.
    pub fn parse_or_default(name: Option<&str>) -> Result<Self, AppError> {
        match name.map(str::trim) {
            None | Some("") => Ok(Self::default()),
            Some(name) => name.parse(),
        }
    }

    /// Return the priority as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Realtime => "realtime",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Idle => "idle",
        }
    }
}

impl fmt::Display for JobPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobPriority {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|priority| priority.as_str() == name)
            .ok_or_else(|| AppError::validation(format!("Priority value {s} does not exist")))
    }
}

impl sqlx::Type<sqlx::Postgres> for JobPriority {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i16 as sqlx::Type<sqlx::Postgres>>::type_info()
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for JobPriority {
    fn encode_by_ref(
        &self,
        buf: &mut <sqlx::Postgres as sqlx::Database>::ArgumentBuffer<'q>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i16 as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.index(), buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for JobPriority {
    fn decode(
        value: <sqlx::Postgres as sqlx::Database>::ValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let index = <i16 as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
        Self::from_index(i64::from(index))
            .ok_or_else(|| format!("priority index {index} out of range").into())
    }
}
