//! Database operations for `scoring_configs`.
//!
//! Exactly one config row is active at a time (enforced by a partial unique
//! index). Callers pass the loaded row into scoring/ranking calls explicitly
//! rather than relying on hidden global state.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// Weight sums may drift by float rounding; anything within this tolerance
/// of 1.0 counts as normalized.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// A row from the `scoring_configs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScoringConfigRow {
    pub id: i64,
    pub name: String,
    pub age_weight: f64,
    pub lexical_weight: f64,
    pub semantic_weight: f64,
    pub preferred_rank_threshold: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl ScoringConfigRow {
    /// True when the three weights sum to 1.0 within tolerance.
    #[must_use]
    pub fn weights_normalized(&self) -> bool {
        let sum = self.age_weight + self.lexical_weight + self.semantic_weight;
        (sum - 1.0).abs() <= WEIGHT_SUM_TOLERANCE
    }
}

const CONFIG_COLUMNS: &str = "id, name, age_weight, lexical_weight, semantic_weight, \
     preferred_rank_threshold, is_active, created_at";

/// Returns the single active scoring config.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no config is active, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_active_scoring_config(pool: &PgPool) -> Result<ScoringConfigRow, DbError> {
    let row = sqlx::query_as::<_, ScoringConfigRow>(&format!(
        "SELECT {CONFIG_COLUMNS} FROM scoring_configs WHERE is_active = TRUE"
    ))
    .fetch_optional(pool)
    .await?;

    row.ok_or(DbError::NotFound)
}

/// Returns a scoring config by name, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_scoring_config_by_name(
    pool: &PgPool,
    name: &str,
) -> Result<Option<ScoringConfigRow>, DbError> {
    let row = sqlx::query_as::<_, ScoringConfigRow>(&format!(
        "SELECT {CONFIG_COLUMNS} FROM scoring_configs WHERE name = $1"
    ))
    .bind(name)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns all scoring configs, active first then by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_scoring_configs(pool: &PgPool) -> Result<Vec<ScoringConfigRow>, DbError> {
    let rows = sqlx::query_as::<_, ScoringConfigRow>(&format!(
        "SELECT {CONFIG_COLUMNS} FROM scoring_configs ORDER BY is_active DESC, name ASC"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Makes the named config the single active one.
///
/// Deactivates the current active row and activates the named row in one
/// transaction, so the partial unique index never sees two active rows.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no config has that name, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn activate_scoring_config(pool: &PgPool, name: &str) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE scoring_configs SET is_active = FALSE WHERE is_active = TRUE")
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("UPDATE scoring_configs SET is_active = TRUE WHERE name = $1")
        .bind(name)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        // Roll back the deactivation rather than leaving no active config.
        tx.rollback().await?;
        return Err(DbError::NotFound);
    }

    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn config(age: f64, lex: f64, sem: f64) -> ScoringConfigRow {
        ScoringConfigRow {
            id: 1,
            name: "test".to_string(),
            age_weight: age,
            lexical_weight: lex,
            semantic_weight: sem,
            preferred_rank_threshold: 100,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn normalized_weights_pass() {
        assert!(config(0.3, 0.4, 0.3).weights_normalized());
    }

    #[test]
    fn rounding_drift_within_tolerance_passes() {
        assert!(config(0.1 + 0.2, 0.4, 0.3).weights_normalized());
    }

    #[test]
    fn unnormalized_weights_fail() {
        assert!(!config(0.5, 0.4, 0.3).weights_normalized());
    }
}
