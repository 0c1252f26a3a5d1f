//! Pipeline error taxonomy.
//!
//! Every stage converts underlying sqlx/parse errors into one of these
//! kinds before returning; nothing propagates an unhandled store fault to
//! the HTTP or CLI boundary.

use darp_db::DbError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed input (bad record, unnormalized weights). The offending
    /// record is skipped; siblings proceed.
    #[error("invalid input: {0}")]
    Validation(String),

    /// An upsert or job transition violated an invariant. The job is left
    /// for retry.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The referenced job or config does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backing store is unreachable or timed out mid-batch. Batch
    /// writes are all-or-nothing, so retry is safe.
    #[error("backing store error: {0}")]
    TransientStore(String),
}

impl PipelineError {
    /// Stable machine-readable code for the HTTP/CLI boundary.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "validation_error",
            PipelineError::Conflict(_) => "conflict",
            PipelineError::NotFound(_) => "not_found",
            PipelineError::TransientStore(_) => "store_unavailable",
        }
    }
}

impl From<DbError> for PipelineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound => PipelineError::NotFound("record not found".to_string()),
            DbError::InvalidImportJobTransition { .. } => PipelineError::Conflict(err.to_string()),
            DbError::Sqlx(e) => from_sqlx(e),
            other => PipelineError::TransientStore(other.to_string()),
        }
    }
}

fn from_sqlx(err: sqlx::Error) -> PipelineError {
    match &err {
        sqlx::Error::RowNotFound => PipelineError::NotFound("record not found".to_string()),
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            PipelineError::Conflict(db.message().to_string())
        }
        _ => PipelineError::TransientStore(err.to_string()),
    }
}
