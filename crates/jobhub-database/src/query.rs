//! Sort/filter/pagination translation for job listings.
//!
//! A [`SortAndFilterRequest`] is first resolved against the job field table
//! into a [`JobQuery`]: unknown filter fields are dropped, filter values are
//! coerced to the field's type, and sort keys are whitelisted. The resolved
//! query is then either rendered into SQL with bound parameters or
//! evaluated in process. Both paths share the same semantics.

use std::cmp::Ordering;

use sqlx::{Postgres, QueryBuilder};
use tracing::warn;

use jobhub_core::error::AppError;
use jobhub_core::result::AppResult;
use jobhub_core::types::{FilterOp, PageRequest, SortAndFilterRequest, SortDirection};
use jobhub_entity::job::{FieldKind, FieldValue, Job, JobField};

/// One resolved `field op value` predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct JobFilter {
    pub field: JobField,
    pub op: FilterOp,
    pub value: FieldValue,
}

impl JobFilter {
    fn matches(&self, job: &Job) -> bool {
        self.field.matches(job, self.op, &self.value)
    }
}

/// A listing request resolved against the field table.
#[derive(Debug, Clone, PartialEq)]
pub struct JobQuery {
    pub filters: Vec<JobFilter>,
    pub sorts: Vec<(JobField, SortDirection)>,
    pub page: PageRequest,
}

impl JobQuery {
    /// Resolve a listing request.
    ///
    /// Without sort keys the order is `id DESC`; otherwise `id ASC` is
    /// appended unless a key already names `id`.
    pub fn resolve(request: &SortAndFilterRequest) -> AppResult<Self> {
        let mut filters = Vec::with_capacity(request.filters.len());
        for filter in &request.filters {
            let Some(field) = JobField::from_name(&filter.field) else {
                warn!(field = %filter.field, "Ignoring unknown filter field");
                continue;
            };
            let value = field.coerce(filter.op, &filter.value)?;
            filters.push(JobFilter {
                field,
                op: filter.op,
                value,
            });
        }

        let mut sorts = Vec::with_capacity(request.sorts.len() + 1);
        for sort in &request.sorts {
            let field = JobField::from_name(&sort.field).ok_or_else(|| {
                AppError::validation(format!("Unknown field {} for sortBy", sort.field))
            })?;
            sorts.push((field, sort.direction));
        }
        if sorts.is_empty() {
            sorts.push((JobField::Id, SortDirection::Desc));
        } else if !sorts.iter().any(|(field, _)| *field == JobField::Id) {
            sorts.push((JobField::Id, SortDirection::Asc));
        }

        Ok(Self {
            filters,
            sorts,
            page: request.page,
        })
    }

    /// Whether a job satisfies every filter.
    pub fn matches(&self, job: &Job) -> bool {
        self.filters.iter().all(|filter| filter.matches(job))
    }

    /// Order two jobs by the sort keys.
    pub fn compare(&self, a: &Job, b: &Job) -> Ordering {
        self.sorts
            .iter()
            .map(|(field, direction)| match direction {
                SortDirection::Asc => field.compare(a, b),
                SortDirection::Desc => field.compare(b, a),
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    /// Build `SELECT COUNT(*)` over the matching rows.
    pub fn count_sql(&self, table: &str) -> QueryBuilder<'static, Postgres> {
        let mut builder = QueryBuilder::new(format!("SELECT COUNT(*) FROM {table}"));
        self.push_where(&mut builder);
        builder
    }

    /// Build the paged `SELECT` of matching rows.
    pub fn select_sql(&self, table: &str) -> QueryBuilder<'static, Postgres> {
        let mut builder = QueryBuilder::new(format!("SELECT * FROM {table}"));
        self.push_where(&mut builder);
        self.push_order_by(&mut builder);
        builder.push(" LIMIT ");
        builder.push_bind(to_i64(self.page.limit()));
        builder.push(" OFFSET ");
        builder.push_bind(to_i64(self.page.offset()));
        builder
    }

    fn push_where(&self, builder: &mut QueryBuilder<'static, Postgres>) {
        for (position, filter) in self.filters.iter().enumerate() {
            builder.push(if position == 0 { " WHERE " } else { " AND " });
            builder.push(filter_expression(filter.field));
            match filter.op {
                FilterOp::Contains | FilterOp::StartsWith | FilterOp::EndsWith => {
                    let escaped = escape_like(&filter.value.as_text());
                    let pattern = match filter.op {
                        FilterOp::Contains => format!("%{escaped}%"),
                        FilterOp::StartsWith => format!("{escaped}%"),
                        _ => format!("%{escaped}"),
                    };
                    builder.push(" LIKE ");
                    builder.push_bind(pattern);
                    builder.push(" ESCAPE '\\'");
                }
                op => {
                    builder.push(comparison_operator(op));
                    push_value(builder, &filter.value);
                }
            }
        }
    }

    fn push_order_by(&self, builder: &mut QueryBuilder<'static, Postgres>) {
        builder.push(" ORDER BY ");
        let keys: Vec<String> = self
            .sorts
            .iter()
            .map(|(field, direction)| format!("{} {}", sort_expression(*field), direction.as_sql()))
            .collect();
        builder.push(keys.join(", "));
    }
}

/// Column expression a filter compares against.
fn filter_expression(field: JobField) -> String {
    match field.kind() {
        FieldKind::Identifier => format!("{}::text COLLATE \"C\"", field.column()),
        FieldKind::Text | FieldKind::Status => format!("{} COLLATE \"C\"", field.column()),
        _ => field.column().to_string(),
    }
}

/// Column expression a sort key orders by.
fn sort_expression(field: JobField) -> String {
    match field.kind() {
        FieldKind::Text | FieldKind::Status => format!("{} COLLATE \"C\"", field.column()),
        _ => field.column().to_string(),
    }
}

fn comparison_operator(op: FilterOp) -> &'static str {
    match op {
        FilterOp::Ne => " <> ",
        FilterOp::Gt => " > ",
        FilterOp::Lt => " < ",
        FilterOp::Gte => " >= ",
        FilterOp::Lte => " <= ",
        _ => " = ",
    }
}

fn push_value(builder: &mut QueryBuilder<'static, Postgres>, value: &FieldValue) {
    match value {
        FieldValue::Text(text) => builder.push_bind(text.clone()),
        FieldValue::Integer(i) => builder.push_bind(*i),
        FieldValue::Timestamp(t) => builder.push_bind(*t),
        FieldValue::Priority(p) => builder.push_bind(p.index()),
        FieldValue::Status(s) => builder.push_bind(s.as_str()),
    };
}

/// Escape `LIKE` wildcards so user text matches literally.
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobhub_core::types::{FilterField, SortField};
    use jobhub_entity::job::{JobPriority, JobStatus};

    #[test]
    fn test_default_order_is_id_desc() {
        let query = JobQuery::resolve(&SortAndFilterRequest::default()).unwrap();
        assert_eq!(query.sorts, vec![(JobField::Id, SortDirection::Desc)]);
        assert_eq!(
            query.select_sql("joblist").sql(),
            "SELECT * FROM joblist ORDER BY id DESC LIMIT $1 OFFSET $2"
        );
    }

    #[test]
    fn test_filters_render_with_binds() {
        let request = SortAndFilterRequest::default()
            .with_filter(FilterField::eq("status", "running"))
            .with_filter(FilterField::new("rank", FilterOp::Gte, 2i64))
            .with_filter(FilterField::new("name", FilterOp::Contains, "50%_off"))
            .with_sort(SortField::asc("name"));
        let query = JobQuery::resolve(&request).unwrap();

        assert_eq!(
            query.count_sql("joblist").sql(),
            "SELECT COUNT(*) FROM joblist WHERE status COLLATE \"C\" = $1 AND rank >= $2 \
             AND name COLLATE \"C\" LIKE $3 ESCAPE '\\'"
        );
        assert_eq!(
            query.select_sql("joblist").sql(),
            "SELECT * FROM joblist WHERE status COLLATE \"C\" = $1 AND rank >= $2 \
             AND name COLLATE \"C\" LIKE $3 ESCAPE '\\' \
             ORDER BY name COLLATE \"C\" ASC, id ASC LIMIT $4 OFFSET $5"
        );
        assert_eq!(query.filters[0].value, FieldValue::Status(JobStatus::Running));
    }

    #[test]
    fn test_identifier_filter_compares_text() {
        let request = SortAndFilterRequest::default()
            .with_filter(FilterField::new("id", FilterOp::StartsWith, "0190"))
            .with_sort(SortField::desc("id"));
        let query = JobQuery::resolve(&request).unwrap();
        assert_eq!(
            query.select_sql("jobs").sql(),
            "SELECT * FROM jobs WHERE id::text COLLATE \"C\" LIKE $1 ESCAPE '\\' \
             ORDER BY id DESC LIMIT $2 OFFSET $3"
        );
    }

    #[test]
    fn test_unknown_filter_is_ignored_and_unknown_sort_rejected() {
        let request =
            SortAndFilterRequest::default().with_filter(FilterField::eq("colour", "blue"));
        assert!(JobQuery::resolve(&request).unwrap().filters.is_empty());

        let request = SortAndFilterRequest::default().with_sort(SortField::asc("colour"));
        let err = JobQuery::resolve(&request).unwrap_err();
        assert_eq!(err.kind, jobhub_core::error::ErrorKind::Validation);
    }

    #[test]
    fn test_uncoercible_value_is_rejected() {
        let request = SortAndFilterRequest::default()
            .with_filter(FilterField::new("progress", FilterOp::Gt, "half"));
        assert!(JobQuery::resolve(&request).is_err());

        let request = SortAndFilterRequest::default()
            .with_filter(FilterField::new("priority", FilterOp::Contains, "hi"));
        assert!(JobQuery::resolve(&request).is_err());
    }

    #[test]
    fn test_in_process_evaluation() {
        let mut high = Job::new("b", "encoding").unwrap();
        high.priority = JobPriority::High;
        let low = Job::new("a", "encoding").unwrap();

        let request = SortAndFilterRequest::default()
            .with_filter(FilterField::new("priority", FilterOp::Lt, "medium"))
            .with_sort(SortField::asc("name"));
        let query = JobQuery::resolve(&request).unwrap();
        assert!(query.matches(&high));
        assert!(!query.matches(&low));
        assert_eq!(query.compare(&low, &high), Ordering::Less);
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }
}
