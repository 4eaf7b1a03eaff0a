//! Schema bootstrap for the job table.
//!
//! The table name comes from configuration, so the DDL is rendered at
//! runtime instead of being embedded with `sqlx::migrate!`. Every
//! statement is idempotent.

use sqlx::PgPool;
use tracing::info;

use jobhub_core::error::{AppError, ErrorKind};
use jobhub_core::result::AppResult;

/// PostgreSQL truncates identifiers longer than this many bytes.
const MAX_IDENTIFIER_LEN: usize = 63;

/// Longest index name suffix added around the table name.
const INDEX_AFFIX_LEN: usize = "idx__modified_at".len();

/// Longest accepted table name; derived index names must stay distinct.
pub const MAX_TABLE_NAME_LEN: usize = MAX_IDENTIFIER_LEN - INDEX_AFFIX_LEN;

/// Check that `table` is a plain, unquoted SQL identifier.
pub fn validate_table_name(table: &str) -> AppResult<()> {
    let mut chars = table.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
                && table.len() <= MAX_TABLE_NAME_LEN
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(AppError::configuration(format!(
            "Invalid job table name '{table}'"
        )))
    }
}

/// Render the statements that create `table` and its indexes.
pub fn schema_statements(table: &str) -> Vec<String> {
    vec![
        format!(
            "CREATE TABLE IF NOT EXISTS {table} (\
             id UUID PRIMARY KEY, \
             correlation_id TEXT NOT NULL DEFAULT '', \
             name TEXT NOT NULL, \
             created_at TIMESTAMPTZ NOT NULL, \
             created_by TEXT NOT NULL DEFAULT '', \
             modified_at TIMESTAMPTZ NOT NULL, \
             modified_by TEXT NOT NULL DEFAULT '', \
             status TEXT NOT NULL CHECK (status IN \
             ('created', 'queued', 'running', 'paused', 'finished', 'failed')), \
             source TEXT NOT NULL DEFAULT '', \
             destination TEXT NOT NULL DEFAULT '', \
             job_type TEXT NOT NULL, \
             sub_type TEXT NOT NULL DEFAULT '', \
             action TEXT NOT NULL DEFAULT '', \
             action_details TEXT NOT NULL DEFAULT '', \
             progress INTEGER NOT NULL DEFAULT 0 CHECK (progress BETWEEN 0 AND 100), \
             history JSONB NOT NULL DEFAULT '{{\"entries\":[]}}', \
             extra_data TEXT NOT NULL DEFAULT '', \
             priority SMALLINT NOT NULL DEFAULT 2 CHECK (priority BETWEEN 0 AND 4), \
             rank INTEGER NOT NULL DEFAULT 0 CHECK (rank >= 0))"
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_dequeue \
             ON {table} (job_type, status, priority, rank DESC, created_at)"
        ),
        format!("CREATE INDEX IF NOT EXISTS idx_{table}_modified_at ON {table} (status, modified_at)"),
    ]
}

/// Create the job table and indexes if they do not exist yet.
pub async fn run_migrations(pool: &PgPool, table: &str) -> AppResult<()> {
    validate_table_name(table)?;
    info!(table, "Running job table migrations");

    for statement in schema_statements(table) {
        sqlx::query(&statement).execute(pool).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                format!("Failed to run migrations for table {table}"),
                e,
            )
        })?;
    }

    info!(table, "Job table migrations completed");
    Ok(())
}
