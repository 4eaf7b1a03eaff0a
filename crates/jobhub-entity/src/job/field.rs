//! Field table shared by the filter/sort translators of both store backends.
//!
//! Each filterable job field has a column name, a value kind and an
//! extractor. The SQL backend renders predicates from the column and kind;
//! the in-memory backend evaluates the same predicates against
//! [`JobField::value_of`]. Text comparisons use byte order, which matches
//! PostgreSQL's `"C"` collation.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};

use jobhub_core::error::AppError;
use jobhub_core::result::AppResult;
use jobhub_core::types::{FilterOp, FilterValue};

use super::model::Job;
use super::status::{JobPriority, JobStatus};

/// How a field's values are typed and compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text; pattern operators allowed.
    Text,
    /// Signed integer.
    Integer,
    /// UTC timestamp, given as RFC 3339.
    Timestamp,
    /// Job id, compared by its canonical text form.
    Identifier,
    /// Priority, compared by index (lower is more urgent).
    Priority,
    /// Status name, compared as text.
    Status,
}

impl FieldKind {
    /// Whether `ct`/`sw`/`ew` make sense for this kind.
    pub fn supports_patterns(&self) -> bool {
        matches!(self, Self::Text | Self::Identifier | Self::Status)
    }
}

/// Filterable and sortable job fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobField {
    Id,
    CorrelationId,
    Name,
    CreatedAt,
    CreatedBy,
    ModifiedAt,
    ModifiedBy,
    Status,
    Source,
    Destination,
    JobType,
    SubType,
    Action,
    ActionDetails,
    Progress,
    ExtraData,
    Priority,
    Rank,
}

impl JobField {
    /// Every field, in column order.
    pub const ALL: [JobField; 18] = [
        Self::Id,
        Self::CorrelationId,
        Self::Name,
        Self::CreatedAt,
        Self::CreatedBy,
        Self::ModifiedAt,
        Self::ModifiedBy,
        Self::Status,
        Self::Source,
        Self::Destination,
        Self::JobType,
        Self::SubType,
        Self::Action,
        Self::ActionDetails,
        Self::Progress,
        Self::ExtraData,
        Self::Priority,
        Self::Rank,
    ];

    /// Resolve a caller-facing field name. `type` and `job_type` both
    /// name the job type.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "type" => Some(Self::JobType),
            name => Self::ALL.into_iter().find(|f| f.column() == name),
        }
    }

    /// Column name in the jobs table.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::CorrelationId => "correlation_id",
            Self::Name => "name",
            Self::CreatedAt => "created_at",
            Self::CreatedBy => "created_by",
            Self::ModifiedAt => "modified_at",
            Self::ModifiedBy => "modified_by",
            Self::Status => "status",
            Self::Source => "source",
            Self::Destination => "destination",
            Self::JobType => "job_type",
            Self::SubType => "sub_type",
            Self::Action => "action",
            Self::ActionDetails => "action_details",
            Self::Progress => "progress",
            Self::ExtraData => "extra_data",
            Self::Priority => "priority",
            Self::Rank => "rank",
        }
    }

    /// Value kind of the field.
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Id => FieldKind::Identifier,
            Self::CreatedAt | Self::ModifiedAt => FieldKind::Timestamp,
            Self::Status => FieldKind::Status,
            Self::Progress | Self::Rank => FieldKind::Integer,
            Self::Priority => FieldKind::Priority,
            _ => FieldKind::Text,
        }
    }

    /// Extract the field's value from a job.
    pub fn value_of(&self, job: &Job) -> FieldValue {
        let text = |s: &str| FieldValue::Text(s.to_string());
        match self {
            Self::Id => FieldValue::Text(job.id.to_string()),
            Self::CorrelationId => text(&job.correlation_id),
            Self::Name => text(&job.name),
            Self::CreatedAt => FieldValue::Timestamp(job.created_at),
            Self::CreatedBy => text(&job.created_by),
            Self::ModifiedAt => FieldValue::Timestamp(job.modified_at),
            Self::ModifiedBy => text(&job.modified_by),
            Self::Status => FieldValue::Status(job.status),
            Self::Source => text(&job.source),
            Self::Destination => text(&job.destination),
            Self::JobType => text(&job.job_type),
            Self::SubType => text(&job.sub_type),
            Self::Action => text(&job.action),
            Self::ActionDetails => text(&job.action_details),
            Self::Progress => FieldValue::Integer(i64::from(job.progress)),
            Self::ExtraData => text(&job.extra_data),
            Self::Priority => FieldValue::Priority(job.priority),
            Self::Rank => FieldValue::Integer(i64::from(job.rank)),
        }
    }

    /// Coerce a filter value to this field's kind for `op`.
    ///
    /// Pattern operators always yield text and are rejected on kinds
    /// without a text form.
    pub fn coerce(&self, op: FilterOp, value: &FilterValue) -> AppResult<FieldValue> {
        let kind = self.kind();
        if op.is_pattern() {
            if !kind.supports_patterns() {
                return Err(AppError::validation(format!(
                    "Operator {op} cannot be used on field {self}"
                )));
            }
            return Ok(FieldValue::Text(value.as_text()));
        }

        let invalid = || {
            AppError::validation(format!(
                "Filter value {} is not valid for field {self}",
                value.as_text()
            ))
        };
        match kind {
            FieldKind::Text | FieldKind::Identifier => Ok(FieldValue::Text(value.as_text())),
            FieldKind::Integer => match value {
                FilterValue::Integer(i) => Ok(FieldValue::Integer(*i)),
                FilterValue::String(s) => s
                    .trim()
                    .parse()
                    .map(FieldValue::Integer)
                    .map_err(|_| invalid()),
            },
            FieldKind::Timestamp => DateTime::parse_from_rfc3339(value.as_text().trim())
                .map(|t| FieldValue::Timestamp(t.with_timezone(&Utc).trunc_subsecs(6)))
                .map_err(|_| invalid()),
            FieldKind::Priority => match value {
                FilterValue::Integer(i) => JobPriority::from_index(*i)
                    .map(FieldValue::Priority)
                    .ok_or_else(invalid),
                FilterValue::String(s) => JobPriority::from_str(s).map(FieldValue::Priority),
            },
            FieldKind::Status => JobStatus::from_str(&value.as_text()).map(FieldValue::Status),
        }
    }

    /// Evaluate `job.<field> <op> value`, with SQL semantics.
    pub fn matches(&self, job: &Job, op: FilterOp, value: &FieldValue) -> bool {
        let actual = self.value_of(job);
        match op {
            FilterOp::Contains => actual.as_text().contains(value.as_text().as_str()),
            FilterOp::StartsWith => actual.as_text().starts_with(value.as_text().as_str()),
            FilterOp::EndsWith => actual.as_text().ends_with(value.as_text().as_str()),
            _ => match actual.compare(value) {
                Some(ordering) => match op {
                    FilterOp::Eq => ordering == Ordering::Equal,
                    FilterOp::Ne => ordering != Ordering::Equal,
                    FilterOp::Gt => ordering == Ordering::Greater,
                    FilterOp::Lt => ordering == Ordering::Less,
                    FilterOp::Gte => ordering != Ordering::Less,
                    FilterOp::Lte => ordering != Ordering::Greater,
                    _ => false,
                },
                None => false,
            },
        }
    }

    /// Order two jobs by this field.
    pub fn compare(&self, a: &Job, b: &Job) -> Ordering {
        self.value_of(a)
            .compare(&self.value_of(b))
            .unwrap_or(Ordering::Equal)
    }
}

impl fmt::Display for JobField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// A typed field value, as extracted from a job or coerced from a filter.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Timestamp(DateTime<Utc>),
    Priority(JobPriority),
    Status(JobStatus),
}

impl FieldValue {
    /// Compare two values of the same kind. Mixed kinds are unordered.
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::Timestamp(a), Self::Timestamp(b)) => Some(a.cmp(b)),
            (Self::Priority(a), Self::Priority(b)) => Some(a.index().cmp(&b.index())),
            (Self::Status(a), Self::Status(b)) => Some(a.as_str().cmp(b.as_str())),
            (Self::Status(a), Self::Text(b)) => Some(a.as_str().as_bytes().cmp(b.as_bytes())),
            (Self::Text(a), Self::Status(b)) => Some(a.as_bytes().cmp(b.as_str().as_bytes())),
            _ => None,
        }
    }

    /// Text form, used by pattern operators.
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Integer(i) => i.to_string(),
            Self::Timestamp(t) => t.to_rfc3339(),
            Self::Priority(p) => p.as_str().to_string(),
            Self::Status(s) => s.as_str().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> Job {
        let mut job = Job::new("Render Final", "encoding").unwrap();
        job.rank = 4;
        job.progress = 50;
        job.priority = JobPriority::High;
        job
    }

    #[test]
    fn test_field_names_resolve() {
        assert_eq!(JobField::from_name("type"), Some(JobField::JobType));
        assert_eq!(JobField::from_name("job_type"), Some(JobField::JobType));
        assert_eq!(JobField::from_name("modified_at"), Some(JobField::ModifiedAt));
        assert_eq!(JobField::from_name("history"), None);
        assert_eq!(JobField::from_name("nope"), None);
    }

    #[test]
    fn test_coerce_integer_and_priority() {
        assert_eq!(
            JobField::Rank.coerce(FilterOp::Gt, &"3".into()).unwrap(),
            FieldValue::Integer(3)
        );
        assert!(JobField::Rank.coerce(FilterOp::Gt, &"three".into()).is_err());
        assert_eq!(
            JobField::Priority.coerce(FilterOp::Eq, &"High".into()).unwrap(),
            FieldValue::Priority(JobPriority::High)
        );
        assert!(JobField::Priority.coerce(FilterOp::Eq, &9i64.into()).is_err());
    }

    #[test]
    fn test_patterns_rejected_on_non_text_kinds() {
        assert!(JobField::Rank.coerce(FilterOp::Contains, &"1".into()).is_err());
        assert!(JobField::CreatedAt.coerce(FilterOp::StartsWith, &"2024".into()).is_err());
        assert!(JobField::Status.coerce(FilterOp::StartsWith, &"run".into()).is_ok());
    }

    #[test]
    fn test_matches_uses_typed_comparison() {
        let job = job();
        let rank = JobField::Rank.coerce(FilterOp::Gte, &"4".into()).unwrap();
        assert!(JobField::Rank.matches(&job, FilterOp::Gte, &rank));
        assert!(!JobField::Rank.matches(&job, FilterOp::Gt, &rank));

        let name = JobField::Name.coerce(FilterOp::Contains, &"Final".into()).unwrap();
        assert!(JobField::Name.matches(&job, FilterOp::Contains, &name));
        let lower = JobField::Name.coerce(FilterOp::Contains, &"final".into()).unwrap();
        assert!(!JobField::Name.matches(&job, FilterOp::Contains, &lower));

        let status = JobField::Status.coerce(FilterOp::Ne, &"running".into()).unwrap();
        assert!(JobField::Status.matches(&job, FilterOp::Ne, &status));
    }

    #[test]
    fn test_timestamp_filter() {
        let job = job();
        let before = JobField::CreatedAt
            .coerce(FilterOp::Lt, &"2000-01-01T00:00:00Z".into())
            .unwrap();
        assert!(!JobField::CreatedAt.matches(&job, FilterOp::Lt, &before));
        assert!(JobField::CreatedAt.matches(&job, FilterOp::Gt, &before));
    }

    #[test]
    fn test_text_order_is_bytewise() {
        let mut a = job();
        let mut b = job();
        a.name = "Zeta".to_string();
        b.name = "alpha".to_string();
        assert_eq!(JobField::Name.compare(&a, &b), Ordering::Less);
    }
}
