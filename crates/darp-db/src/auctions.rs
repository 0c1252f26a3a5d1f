//! Database operations for the `auctions` table: staging merge, batch
//! selection, bulk score write-back, ranking, and expiry.

use std::time::Instant;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row and outcome types
// ---------------------------------------------------------------------------

/// A row from the `auctions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuctionRow {
    pub id: i64,
    pub domain_name: String,
    pub auction_site: String,
    pub start_date: Option<DateTime<Utc>>,
    pub expiration_date: DateTime<Utc>,
    pub current_bid: Option<Decimal>,
    pub offer_type: Option<String>,
    pub source_data: serde_json::Value,
    pub link: Option<String>,
    pub first_seen_at: DateTime<Utc>,
    pub processed: bool,
    pub passed_filter: Option<bool>,
    pub filter_reason: Option<String>,
    pub age_score: Option<f64>,
    pub lexical_frequency_score: Option<f64>,
    pub semantic_value_score: Option<f64>,
    pub total_score: Option<f64>,
    pub rank: Option<i32>,
    pub preferred: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of merging one staging job into the main table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    pub inserted: u64,
    pub updated: u64,
}

/// One row's scoring verdict, written back in bulk by [`apply_score_updates`].
#[derive(Debug, Clone)]
pub struct ScoreUpdate {
    pub id: i64,
    pub passed_filter: bool,
    pub filter_reason: Option<String>,
    pub age_score: Option<f64>,
    pub lexical_frequency_score: Option<f64>,
    pub semantic_value_score: Option<f64>,
    pub total_score: Option<f64>,
}

/// Result of a full ranking recompute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingOutcome {
    pub ranked_count: u64,
    pub preferred_count: u64,
    pub execution_time_seconds: f64,
}

/// Pipeline progress counters for the dashboard/CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct ScoringStats {
    pub unprocessed_count: i64,
    pub processed_count: i64,
    pub scored_count: i64,
    pub total_count: i64,
}

const AUCTION_COLUMNS: &str = "id, domain_name, auction_site, start_date, expiration_date, \
     current_bid, offer_type, source_data, link, first_seen_at, \
     processed, passed_filter, filter_reason, age_score, \
     lexical_frequency_score, semantic_value_score, total_score, \
     rank, preferred, created_at, updated_at";

// ---------------------------------------------------------------------------
// Merge-to-main
// ---------------------------------------------------------------------------

/// Merges one import job's staging rows into `auctions` and deletes the
/// consumed staging rows, all in a single transaction.
///
/// Conflicts on `(domain_name, auction_site, expiration_date)` overwrite the
/// listing fields with the staged values; `link` is only overwritten when the
/// staged value is non-null, and scoring state plus `first_seen_at` are left
/// untouched. Duplicate natural keys within the same job collapse to the
/// latest staged row.
///
/// Never reads or deletes staging rows belonging to another job.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; the transaction rolls
/// back and the job's staging rows remain for retry.
pub async fn merge_staging_job(
    pool: &PgPool,
    job_id: Uuid,
    auction_site: &str,
) -> Result<MergeOutcome, DbError> {
    let mut tx = pool.begin().await?;

    let rows = sqlx::query(
        "INSERT INTO auctions \
             (domain_name, auction_site, start_date, expiration_date, \
              current_bid, offer_type, source_data, link) \
         SELECT DISTINCT ON (domain_name, auction_site, expiration_date) \
                domain_name, auction_site, start_date, expiration_date, \
                current_bid, offer_type, source_data, link \
         FROM staging_listings \
         WHERE job_id = $1 AND auction_site = $2 \
         ORDER BY domain_name, auction_site, expiration_date, id DESC \
         ON CONFLICT (domain_name, auction_site, expiration_date) DO UPDATE SET \
             start_date   = EXCLUDED.start_date, \
             current_bid  = EXCLUDED.current_bid, \
             offer_type   = EXCLUDED.offer_type, \
             source_data  = EXCLUDED.source_data, \
             link         = COALESCE(EXCLUDED.link, auctions.link), \
             updated_at   = NOW() \
         RETURNING (xmax = 0) AS inserted",
    )
    .bind(job_id)
    .bind(auction_site)
    .fetch_all(&mut *tx)
    .await?;

    let inserted = rows
        .iter()
        .filter(|row| row.get::<bool, _>("inserted"))
        .count() as u64;
    let updated = rows.len() as u64 - inserted;

    sqlx::query("DELETE FROM staging_listings WHERE job_id = $1 AND auction_site = $2")
        .bind(job_id)
        .bind(auction_site)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(MergeOutcome { inserted, updated })
}

// ---------------------------------------------------------------------------
// Batch selection and score write-back
// ---------------------------------------------------------------------------

/// Selects up to `batch_size` unprocessed rows in insertion order.
///
/// The ordering is deterministic (`id ASC`) so repeated calls make forward
/// progress without skipping rows.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn fetch_unprocessed_batch(
    pool: &PgPool,
    batch_size: i64,
) -> Result<Vec<AuctionRow>, DbError> {
    let rows = sqlx::query_as::<_, AuctionRow>(&format!(
        "SELECT {AUCTION_COLUMNS} FROM auctions \
         WHERE processed = FALSE \
         ORDER BY id ASC \
         LIMIT $1"
    ))
    .bind(batch_size)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Writes one batch of scoring verdicts back in a single bulk `UPDATE`,
/// marking every touched row `processed = true`.
///
/// The statement is all-or-nothing: a failure leaves no row in the batch
/// processed. Rows already marked processed are skipped, so a duplicate
/// selection is an idempotent no-op and score fields are only ever set once.
///
/// Returns the number of rows actually marked processed by this call.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn apply_score_updates(pool: &PgPool, updates: &[ScoreUpdate]) -> Result<u64, DbError> {
    if updates.is_empty() {
        return Ok(0);
    }

    let mut ids = Vec::with_capacity(updates.len());
    let mut passed = Vec::with_capacity(updates.len());
    let mut reasons = Vec::with_capacity(updates.len());
    let mut age_scores = Vec::with_capacity(updates.len());
    let mut lexical_scores = Vec::with_capacity(updates.len());
    let mut semantic_scores = Vec::with_capacity(updates.len());
    let mut total_scores = Vec::with_capacity(updates.len());

    for update in updates {
        ids.push(update.id);
        passed.push(update.passed_filter);
        reasons.push(update.filter_reason.clone());
        age_scores.push(update.age_score);
        lexical_scores.push(update.lexical_frequency_score);
        semantic_scores.push(update.semantic_value_score);
        total_scores.push(update.total_score);
    }

    let result = sqlx::query(
        "UPDATE auctions AS a SET \
             processed               = TRUE, \
             passed_filter           = u.passed_filter, \
             filter_reason           = u.filter_reason, \
             age_score               = u.age_score, \
             lexical_frequency_score = u.lexical_frequency_score, \
             semantic_value_score    = u.semantic_value_score, \
             total_score             = u.total_score, \
             updated_at              = NOW() \
         FROM UNNEST($1::bigint[], $2::boolean[], $3::text[], $4::float8[], \
                     $5::float8[], $6::float8[], $7::float8[]) \
              AS u(id, passed_filter, filter_reason, age_score, \
                   lexical_frequency_score, semantic_value_score, total_score) \
         WHERE a.id = u.id AND a.processed = FALSE",
    )
    .bind(&ids)
    .bind(&passed)
    .bind(&reasons)
    .bind(&age_scores)
    .bind(&lexical_scores)
    .bind(&semantic_scores)
    .bind(&total_scores)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

/// Recomputes the global dense rank over all scored rows.
///
/// Ordering is `total_score DESC, domain_name ASC` so ties resolve
/// deterministically and repeated runs over unchanged scores produce
/// identical ranks. Rows without a `total_score` are reset to
/// `rank = NULL, preferred = false` in the same transaction; this is a full
/// recompute, safe to invoke at any time (but not concurrently with itself).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either statement fails.
pub async fn recalculate_rankings(
    pool: &PgPool,
    preferred_rank_threshold: i32,
) -> Result<RankingOutcome, DbError> {
    let started = Instant::now();
    let mut tx = pool.begin().await?;

    sqlx::query(
        "UPDATE auctions SET rank = NULL, preferred = FALSE \
         WHERE total_score IS NULL AND (rank IS NOT NULL OR preferred = TRUE)",
    )
    .execute(&mut *tx)
    .await?;

    let rows = sqlx::query(
        "WITH ranked AS ( \
             SELECT id, \
                    DENSE_RANK() OVER (ORDER BY total_score DESC, domain_name ASC) AS new_rank \
             FROM auctions \
             WHERE total_score IS NOT NULL \
         ) \
         UPDATE auctions AS a SET \
             rank      = ranked.new_rank, \
             preferred = (ranked.new_rank <= $1), \
             updated_at = NOW() \
         FROM ranked \
         WHERE a.id = ranked.id \
         RETURNING a.preferred",
    )
    .bind(preferred_rank_threshold)
    .fetch_all(&mut *tx)
    .await?;

    tx.commit().await?;

    let ranked_count = rows.len() as u64;
    let preferred_count = rows
        .iter()
        .filter(|row| row.get::<bool, _>("preferred"))
        .count() as u64;

    Ok(RankingOutcome {
        ranked_count,
        preferred_count,
        execution_time_seconds: started.elapsed().as_secs_f64(),
    })
}

// ---------------------------------------------------------------------------
// Stats, expiry, reads
// ---------------------------------------------------------------------------

/// Returns pipeline progress counters over the whole `auctions` table.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn scoring_stats(pool: &PgPool) -> Result<ScoringStats, DbError> {
    let stats = sqlx::query_as::<_, ScoringStats>(
        "SELECT COUNT(*) FILTER (WHERE processed = FALSE)         AS unprocessed_count, \
                COUNT(*) FILTER (WHERE processed = TRUE)          AS processed_count, \
                COUNT(*) FILTER (WHERE total_score IS NOT NULL)   AS scored_count, \
                COUNT(*)                                          AS total_count \
         FROM auctions",
    )
    .fetch_one(pool)
    .await?;

    Ok(stats)
}

/// Deletes every auction whose listing has expired. Touches only the main
/// table, never staging. Returns the number of rows removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_expired_auctions(pool: &PgPool) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM auctions WHERE expiration_date < NOW()")
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Returns auctions ordered by rank (unranked rows last), optionally only
/// the preferred slice.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_auctions(
    pool: &PgPool,
    limit: i64,
    preferred_only: bool,
) -> Result<Vec<AuctionRow>, DbError> {
    let rows = sqlx::query_as::<_, AuctionRow>(&format!(
        "SELECT {AUCTION_COLUMNS} FROM auctions \
         WHERE ($2 = FALSE OR preferred = TRUE) \
         ORDER BY rank ASC NULLS LAST, domain_name ASC \
         LIMIT $1"
    ))
    .bind(limit)
    .bind(preferred_only)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a single auction by its natural key, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_auction_by_key(
    pool: &PgPool,
    domain_name: &str,
    auction_site: &str,
    expiration_date: DateTime<Utc>,
) -> Result<Option<AuctionRow>, DbError> {
    let row = sqlx::query_as::<_, AuctionRow>(&format!(
        "SELECT {AUCTION_COLUMNS} FROM auctions \
         WHERE domain_name = $1 AND auction_site = $2 AND expiration_date = $3"
    ))
    .bind(domain_name)
    .bind(auction_site)
    .bind(expiration_date)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
