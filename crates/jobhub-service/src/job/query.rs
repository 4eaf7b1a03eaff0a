//! Query-parameter parsing for job listings.
//!
//! Recognized keys:
//! - `sortBy=<field>.<asc|desc>[,<field>.<asc|desc>...]`
//! - `limit=<n>` with `1 <= n <= max`, defaulting to the max
//! - `offset=<n>` with `n >= 0`
//! - `<field>=<op>:<value>` or `<field>=<value>` (same as `eq`); a bare
//!   value holding a letters-only prefix and a colon needs `eq:` unless it
//!   is a `scheme://` URL
//!
//! Keys naming no job field are ignored.

use tracing::info;

use jobhub_core::error::AppError;
use jobhub_core::result::AppResult;
use jobhub_core::types::{FilterField, FilterOp, PageRequest, SortAndFilterRequest, SortField};
use jobhub_entity::job::JobField;

const SORT_KEY: &str = "sortBy";
const LIMIT_KEY: &str = "limit";
const OFFSET_KEY: &str = "offset";

/// Turn raw `(key, value)` query pairs into a listing request.
pub fn parse_list_params<K, V>(params: &[(K, V)], max_limit: u64) -> AppResult<SortAndFilterRequest>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut request = SortAndFilterRequest::default();
    let mut limit = max_limit;
    let mut offset = 0;

    for (key, value) in params {
        let (key, value) = (key.as_ref(), value.as_ref());
        match key {
            SORT_KEY => request.sorts.extend(parse_sorts(value)?),
            LIMIT_KEY => limit = parse_limit(value, max_limit)?,
            OFFSET_KEY => offset = parse_offset(value)?,
            _ => match JobField::from_name(key) {
                Some(_) => request.filters.push(parse_filter(key, value)?),
                None => info!(field = key, "Ignoring unknown filter field"),
            },
        }
    }

    request.page = PageRequest::new(limit, offset);
    Ok(request)
}

fn parse_sorts(value: &str) -> AppResult<Vec<SortField>> {
    value
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            let sort: SortField = part.parse()?;
            match JobField::from_name(&sort.field) {
                Some(_) => Ok(sort),
                None => Err(AppError::validation(format!(
                    "Unknown field {} for sortBy",
                    sort.field
                ))),
            }
        })
        .collect()
}

fn parse_limit(value: &str, max_limit: u64) -> AppResult<u64> {
    let limit: i64 = value.trim().parse().map_err(|_| {
        AppError::validation(format!("Could not convert limit {value} to integer"))
    })?;
    if limit < 1 {
        return Err(AppError::validation(format!(
            "Limit was set to {limit} (too low). Must be between 1 and {max_limit}"
        )));
    }
    let limit = limit as u64;
    if limit > max_limit {
        return Err(AppError::validation(format!(
            "Limit was set to {limit} (too high). Must be between 1 and {max_limit}"
        )));
    }
    Ok(limit)
}

fn parse_offset(value: &str) -> AppResult<u64> {
    let offset: i64 = value.trim().parse().map_err(|_| {
        AppError::validation(format!("Could not convert offset {value} to integer"))
    })?;
    u64::try_from(offset)
        .map_err(|_| AppError::validation(format!("Offset {offset} must not be negative")))
}

/// Split `op:value`. A prefix that is not an operator token is part of
/// the value unless it looks like one (letters only), so timestamps can
/// be given bare. A `scheme://` prefix is always part of the value.
fn parse_filter(field: &str, value: &str) -> AppResult<FilterField> {
    if let Some((prefix, rest)) = value.split_once(':') {
        if rest.starts_with("//") {
            return Ok(FilterField::eq(field, value));
        }
        if let Ok(op) = prefix.parse::<FilterOp>() {
            return Ok(FilterField::new(field, op, rest));
        }
        if !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(AppError::validation(format!(
                "Unknown operator {prefix} for filter"
            )));
        }
    }
    Ok(FilterField::eq(field, value))
}
