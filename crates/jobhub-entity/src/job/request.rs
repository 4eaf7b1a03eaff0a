//! Caller-supplied create and update payloads.
//!
//! Every field is optional. A missing or blank string and a zero rank mean
//! "not supplied".

use serde::{Deserialize, Serialize};

/// Payload for creating a job. Only `type` is required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub correlation_id: Option<String>,
    pub name: Option<String>,
    pub created_by: Option<String>,
    pub source: Option<String>,
    pub destination: Option<String>,
    #[serde(rename = "type")]
    pub job_type: Option<String>,
    pub sub_type: Option<String>,
    pub action: Option<String>,
    pub action_details: Option<String>,
    pub extra_data: Option<String>,
    /// Priority name; blank resolves to `medium`.
    pub priority: Option<String>,
    pub rank: Option<i64>,
}

impl CreateJobRequest {
    /// Request for a job of the given type with everything else defaulted.
    pub fn with_type(job_type: impl Into<String>) -> Self {
        Self {
            job_type: Some(job_type.into()),
            ..Self::default()
        }
    }
}

/// Partial update. Present, non-blank fields override the stored job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateJobRequest {
    pub correlation_id: Option<String>,
    pub name: Option<String>,
    /// Actor tag recorded as `modified_by`.
    pub modified_by: Option<String>,
    pub source: Option<String>,
    pub destination: Option<String>,
    #[serde(rename = "type")]
    pub job_type: Option<String>,
    pub sub_type: Option<String>,
    pub action: Option<String>,
    pub action_details: Option<String>,
    pub extra_data: Option<String>,
    pub priority: Option<String>,
    pub rank: Option<i64>,
}

/// Trimmed value of an optional string, or `None` when missing or blank.
pub fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Clamp a caller rank into the stored range; anything outside becomes 0.
pub fn normalize_rank(rank: i64) -> i32 {
    i32::try_from(rank).ok().filter(|r| *r > 0).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_present_treats_blank_as_missing() {
        assert_eq!(present(&None), None);
        assert_eq!(present(&Some("   ".to_string())), None);
        assert_eq!(present(&Some(" a ".to_string())), Some("a"));
    }

    #[test]
    fn test_normalize_rank() {
        assert_eq!(normalize_rank(5), 5);
        assert_eq!(normalize_rank(-1), 0);
        assert_eq!(normalize_rank(i64::from(i32::MAX) + 1), 0);
    }

    #[test]
    fn test_create_request_uses_type_key() {
        let request: CreateJobRequest = serde_json::from_str(
            r#"{"type":"encoding","subType":"h264","correlationId":"c-1","rank":3}"#,
        )
        .unwrap();
        assert_eq!(request.job_type.as_deref(), Some("encoding"));
        assert_eq!(request.sub_type.as_deref(), Some("h264"));
        assert_eq!(request.correlation_id.as_deref(), Some("c-1"));
        assert_eq!(request.rank, Some(3));
        assert_eq!(request.name, None);
    }
}
