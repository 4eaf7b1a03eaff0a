//! Filter types for dynamic query building.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Filter comparison operator.
///
/// The set is closed; every backend renders or evaluates each member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOp {
    /// Exact equality.
    #[serde(rename = "eq")]
    Eq,
    /// Not equal.
    #[serde(rename = "neq")]
    Ne,
    /// Substring match.
    #[serde(rename = "ct")]
    Contains,
    /// Prefix match.
    #[serde(rename = "sw")]
    StartsWith,
    /// Suffix match.
    #[serde(rename = "ew")]
    EndsWith,
    /// Greater than.
    #[serde(rename = "gt")]
    Gt,
    /// Less than.
    #[serde(rename = "lt")]
    Lt,
    /// Greater than or equal.
    #[serde(rename = "gte")]
    Gte,
    /// Less than or equal.
    #[serde(rename = "lte")]
    Lte,
}

impl FilterOp {
    /// Every operator, in query-token order.
    pub const ALL: [FilterOp; 9] = [
        Self::Eq,
        Self::Ne,
        Self::Contains,
        Self::StartsWith,
        Self::EndsWith,
        Self::Gt,
        Self::Lt,
        Self::Gte,
        Self::Lte,
    ];

    /// Short token used in query strings (`status=neq:running`).
    pub fn as_token(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "neq",
            Self::Contains => "ct",
            Self::StartsWith => "sw",
            Self::EndsWith => "ew",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Gte => "gte",
            Self::Lte => "lte",
        }
    }

    /// Whether the operator is a pattern match rather than a comparison.
    pub fn is_pattern(&self) -> bool {
        matches!(self, Self::Contains | Self::StartsWith | Self::EndsWith)
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

impl FromStr for FilterOp {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|op| op.as_token() == token)
            .ok_or_else(|| AppError::validation(format!("Unknown operator {s} for filter")))
    }
}

/// A dynamic filter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// A string value.
    String(String),
    /// An integer value.
    Integer(i64),
}

impl FilterValue {
    /// Render the value as text, the form pattern operators match against.
    pub fn as_text(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Integer(i) => i.to_string(),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

/// A single filter condition on a named field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterField {
    /// The column or field name to filter on.
    pub field: String,
    /// The comparison operator.
    pub op: FilterOp,
    /// The value to compare against.
    pub value: FilterValue,
}

impl FilterField {
    /// Create a new filter field.
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<FilterValue>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Shorthand for an equality filter.
    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }
}
