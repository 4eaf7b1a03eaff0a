//! Job store backend configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Which job store implementation backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Durable PostgreSQL table.
    #[default]
    Postgres,
    /// Process-local map, lost on restart.
    Memory,
}

/// Job store settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StoreConfig {
    /// Backend selection.
    #[serde(default)]
    pub backend: StoreBackend,
    /// Name of the job table (PostgreSQL backend only).
    #[serde(default = "default_table")]
    #[validate(length(min = 1, max = 47))]
    pub table: String,
    /// Upper bound for the `limit` of a single list request.
    #[serde(default = "default_max_result_limit")]
    #[validate(range(min = 1))]
    pub max_result_limit: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            table: default_table(),
            max_result_limit: default_max_result_limit(),
        }
    }
}

fn default_table() -> String {
    "joblist".to_string()
}

fn default_max_result_limit() -> u64 {
    100
}
