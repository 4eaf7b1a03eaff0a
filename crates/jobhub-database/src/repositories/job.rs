//! PostgreSQL job store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, error, info};

use jobhub_core::error::{AppError, ErrorKind};
use jobhub_core::result::AppResult;
use jobhub_core::types::{JobId, PageResponse, SortAndFilterRequest};
use jobhub_entity::job::{merge_job, Job, JobStatus, UpdateJobRequest};

use crate::migration::validate_table_name;
use crate::query::JobQuery;
use crate::store::{job_exists, job_not_found, nothing_to_dequeue, JobStore};

const COLUMNS: &str = "id, correlation_id, name, created_at, created_by, modified_at, \
    modified_by, status, source, destination, job_type, sub_type, action, action_details, \
    progress, history, extra_data, priority, rank";

/// Statements rendered once for the configured table.
#[derive(Debug)]
struct Statements {
    insert: String,
    select_by_id: String,
    select_for_update: String,
    update: String,
    delete_by_id: String,
    delete_all: String,
    dequeue: String,
    delete_aged: String,
    count_aged: String,
}

impl Statements {
    fn new(table: &str) -> Self {
        Self {
            insert: format!(
                "INSERT INTO {table} ({COLUMNS}) VALUES \
                 ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19) \
                 RETURNING *"
            ),
            select_by_id: format!("SELECT * FROM {table} WHERE id = $1"),
            select_for_update: format!("SELECT * FROM {table} WHERE id = $1 FOR UPDATE"),
            update: format!(
                "UPDATE {table} SET correlation_id = $2, name = $3, modified_at = $4, \
                 modified_by = $5, status = $6, source = $7, destination = $8, job_type = $9, \
                 sub_type = $10, action = $11, action_details = $12, progress = $13, \
                 history = $14, extra_data = $15, priority = $16, rank = $17 WHERE id = $1"
            ),
            delete_by_id: format!("DELETE FROM {table} WHERE id = $1"),
            delete_all: format!("DELETE FROM {table}"),
            dequeue: format!(
                "SELECT * FROM {table} WHERE status = 'created' AND job_type = $1 \
                 ORDER BY priority ASC, rank DESC, created_at ASC, id ASC \
                 LIMIT 1 FOR UPDATE SKIP LOCKED"
            ),
            delete_aged: format!("DELETE FROM {table} WHERE status = $1 AND modified_at < $2"),
            count_aged: format!(
                "SELECT COUNT(*) FROM {table} WHERE status = $1 AND modified_at < $2"
            ),
        }
    }
}

/// Job store backed by one PostgreSQL table.
///
/// Every call runs on its own pooled connection; mutations of an existing
/// row lock it with `FOR UPDATE` inside a transaction.
#[derive(Debug, Clone)]
pub struct PgJobRepository {
    pool: PgPool,
    table: String,
    sql: std::sync::Arc<Statements>,
}

impl PgJobRepository {
    /// Create a repository over `table`, which must be a plain identifier.
    pub fn new(pool: PgPool, table: &str) -> AppResult<Self> {
        validate_table_name(table)?;
        Ok(Self {
            pool,
            table: table.to_string(),
            sql: std::sync::Arc::new(Statements::new(table)),
        })
    }

    /// Name of the backing table.
    pub fn table(&self) -> &str {
        &self.table
    }

    async fn begin(&self) -> AppResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(db_error("Failed to start transaction"))
    }

    async fn lock_by_id(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        id: JobId,
    ) -> AppResult<Job> {
        sqlx::query_as::<_, Job>(&self.sql.select_for_update)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(db_error("Failed to load job"))?
            .ok_or_else(|| job_not_found(id))
    }

    async fn write(&self, tx: &mut Transaction<'static, Postgres>, job: &Job) -> AppResult<()> {
        sqlx::query(&self.sql.update)
            .bind(job.id)
            .bind(&job.correlation_id)
            .bind(&job.name)
            .bind(job.modified_at)
            .bind(&job.modified_by)
            .bind(job.status)
            .bind(&job.source)
            .bind(&job.destination)
            .bind(&job.job_type)
            .bind(&job.sub_type)
            .bind(&job.action)
            .bind(&job.action_details)
            .bind(job.progress)
            .bind(Json(&job.history))
            .bind(&job.extra_data)
            .bind(job.priority)
            .bind(job.rank)
            .execute(&mut **tx)
            .await
            .map_err(db_error("Failed to update job"))?;
        Ok(())
    }

    /// Lock a row, apply `change` and persist it in one transaction.
    async fn modify<F>(&self, id: JobId, change: F) -> AppResult<Job>
    where
        F: FnOnce(&mut Job) -> AppResult<()> + Send,
    {
        let mut tx = self.begin().await?;
        let mut job = self.lock_by_id(&mut tx, id).await?;
        change(&mut job)?;
        self.write(&mut tx, &job).await?;
        tx.commit()
            .await
            .map_err(db_error("Failed to commit job change"))?;
        Ok(job)
    }
}

#[async_trait]
impl JobStore for PgJobRepository {
    async fn create(&self, job: Job) -> AppResult<Job> {
        let created = sqlx::query_as::<_, Job>(&self.sql.insert)
            .bind(job.id)
            .bind(&job.correlation_id)
            .bind(&job.name)
            .bind(job.created_at)
            .bind(&job.created_by)
            .bind(job.modified_at)
            .bind(&job.modified_by)
            .bind(job.status)
            .bind(&job.source)
            .bind(&job.destination)
            .bind(&job.job_type)
            .bind(&job.sub_type)
            .bind(&job.action)
            .bind(&job.action_details)
            .bind(job.progress)
            .bind(Json(&job.history))
            .bind(&job.extra_data)
            .bind(job.priority)
            .bind(job.rank)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e.as_database_error() {
                Some(db) if db.is_unique_violation() => job_exists(job.id),
                _ => db_error("Failed to create job")(e),
            })?;

        info!(job_id = %created.id, job_type = %created.job_type, "Job created");
        Ok(created)
    }

    async fn find_all(&self, request: &SortAndFilterRequest) -> AppResult<PageResponse<Job>> {
        let query = JobQuery::resolve(request)?;

        // Count and page must come from the same snapshot.
        let mut tx = self.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to start snapshot"))?;

        let total: i64 = query
            .count_sql(&self.table)
            .build_query_scalar::<i64>()
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error("Failed to count jobs"))?;
        if total == 0 {
            return Ok(PageResponse::empty(&query.page));
        }

        let jobs = query
            .select_sql(&self.table)
            .build_query_as::<Job>()
            .fetch_all(&mut *tx)
            .await
            .map_err(db_error("Failed to list jobs"))?;
        tx.commit()
            .await
            .map_err(db_error("Failed to finish job listing"))?;

        debug!(total, returned = jobs.len(), "Listed jobs");
        Ok(PageResponse::new(jobs, &query.page, total as u64))
    }

    async fn find_by_id(&self, id: JobId) -> AppResult<Job> {
        sqlx::query_as::<_, Job>(&self.sql.select_by_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find job"))?
            .ok_or_else(|| job_not_found(id))
    }

    async fn update(&self, id: JobId, request: &UpdateJobRequest) -> AppResult<Job> {
        let mut tx = self.begin().await?;
        let current = self.lock_by_id(&mut tx, id).await?;
        let merged = merge_job(&current, request)?;
        if !merged.is_changed() {
            return Ok(current);
        }

        self.write(&mut tx, &merged.job).await?;
        tx.commit()
            .await
            .map_err(db_error("Failed to commit job update"))?;

        info!(job_id = %id, changed = merged.changes.len(), "Job updated");
        Ok(merged.job)
    }

    async fn delete_by_id(&self, id: JobId) -> AppResult<()> {
        let result = sqlx::query(&self.sql.delete_by_id)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete job"))?;
        if result.rows_affected() == 0 {
            return Err(job_not_found(id));
        }
        info!(job_id = %id, "Job deleted");
        Ok(())
    }

    async fn delete_all(&self) -> AppResult<u64> {
        let result = sqlx::query(&self.sql.delete_all)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete jobs"))?;
        info!(deleted = result.rows_affected(), "All jobs deleted");
        Ok(result.rows_affected())
    }

    async fn dequeue(&self, job_type: &str) -> AppResult<Job> {
        let mut tx = self.begin().await?;
        let mut job = sqlx::query_as::<_, Job>(&self.sql.dequeue)
            .bind(job_type)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("Failed to dequeue job"))?
            .ok_or_else(|| nothing_to_dequeue(job_type))?;

        job.apply_dequeue();
        self.write(&mut tx, &job).await?;
        tx.commit()
            .await
            .map_err(db_error("Failed to commit dequeue"))?;

        info!(job_id = %job.id, job_type, priority = %job.priority, "Job dequeued");
        Ok(job)
    }

    async fn set_status_by_id(
        &self,
        id: JobId,
        status: JobStatus,
        message: Option<&str>,
    ) -> AppResult<Job> {
        let job = self
            .modify(id, |job| {
                job.apply_status(status, message);
                Ok(())
            })
            .await?;
        info!(job_id = %id, status = %status, "Job status changed");
        Ok(job)
    }

    async fn set_history_by_id(&self, id: JobId, message: &str) -> AppResult<Job> {
        self.modify(id, |job| {
            job.apply_history(message);
            Ok(())
        })
        .await
    }

    async fn set_progress_by_id(&self, id: JobId, progress: i32) -> AppResult<Job> {
        self.modify(id, |job| job.apply_progress(progress)).await
    }

    async fn delete_by_status_older_than(
        &self,
        status: JobStatus,
        cutoff: DateTime<Utc>,
    ) -> AppResult<u64> {
        let result = sqlx::query(&self.sql.delete_aged)
            .bind(status)
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to purge jobs"))?;
        Ok(result.rows_affected())
    }

    async fn count_by_status_older_than(
        &self,
        status: JobStatus,
        cutoff: DateTime<Utc>,
    ) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar(&self.sql.count_aged)
            .bind(status)
            .bind(cutoff)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to count aged jobs"))?;
        Ok(count as u64)
    }
}

/// Log a driver failure and wrap it without exposing its detail.
fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| {
        error!(error = %e, "{context}");
        AppError::with_source(ErrorKind::Database, context, e)
    }
}
