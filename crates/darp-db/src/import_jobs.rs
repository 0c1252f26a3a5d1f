//! Database operations for `import_jobs`.
//!
//! One row per staging import, keyed by the caller-supplied job UUID, so
//! retries and dashboards can see what each upload did.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `import_jobs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ImportJobRow {
    pub id: i64,
    pub job_id: Uuid,
    pub auction_site: String,
    pub status: String,
    pub records_staged: i32,
    pub records_skipped: i32,
    pub inserted: i32,
    pub updated: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

const JOB_COLUMNS: &str = "id, job_id, auction_site, status, records_staged, records_skipped, \
     inserted, updated, error_message, created_at, completed_at";

/// Creates a new import job in `running` status and returns the row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including a duplicate
/// `job_id`).
pub async fn create_import_job(
    pool: &PgPool,
    job_id: Uuid,
    auction_site: &str,
) -> Result<ImportJobRow, DbError> {
    let row = sqlx::query_as::<_, ImportJobRow>(&format!(
        "INSERT INTO import_jobs (job_id, auction_site, status) \
         VALUES ($1, $2, 'running') \
         RETURNING {JOB_COLUMNS}"
    ))
    .bind(job_id)
    .bind(auction_site)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a job `succeeded` and records its counters.
///
/// # Errors
///
/// Returns [`DbError::InvalidImportJobTransition`] if the job is not in
/// `running` status, or [`DbError::Sqlx`] if the update fails.
pub async fn complete_import_job(
    pool: &PgPool,
    job_id: Uuid,
    records_staged: i32,
    records_skipped: i32,
    inserted: i32,
    updated: i32,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE import_jobs \
         SET status = 'succeeded', completed_at = NOW(), \
             records_staged = $1, records_skipped = $2, inserted = $3, updated = $4 \
         WHERE job_id = $5 AND status = 'running'",
    )
    .bind(records_staged)
    .bind(records_skipped)
    .bind(inserted)
    .bind(updated)
    .bind(job_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidImportJobTransition {
            job_id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Marks a job `failed` with an error message.
///
/// # Errors
///
/// Returns [`DbError::InvalidImportJobTransition`] if the job is not in
/// `running` status, or [`DbError::Sqlx`] if the update fails.
pub async fn fail_import_job(
    pool: &PgPool,
    job_id: Uuid,
    error_message: &str,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE import_jobs \
         SET status = 'failed', completed_at = NOW(), error_message = $1 \
         WHERE job_id = $2 AND status = 'running'",
    )
    .bind(error_message)
    .bind(job_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidImportJobTransition {
            job_id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Returns an import job by its UUID.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no job has that id, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_import_job(pool: &PgPool, job_id: Uuid) -> Result<ImportJobRow, DbError> {
    let row = sqlx::query_as::<_, ImportJobRow>(&format!(
        "SELECT {JOB_COLUMNS} FROM import_jobs WHERE job_id = $1"
    ))
    .bind(job_id)
    .fetch_optional(pool)
    .await?;

    row.ok_or(DbError::NotFound)
}
