//! Database operations for `staging_listings`.
//!
//! Staging rows are always scoped by `job_id`; no operation here ever reads
//! or deletes rows belonging to another import job.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use darp_core::RawListing;

use crate::DbError;

/// A row from the `staging_listings` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StagingRow {
    pub id: i64,
    pub job_id: Uuid,
    pub auction_site: String,
    pub domain_name: String,
    pub start_date: Option<DateTime<Utc>>,
    pub expiration_date: DateTime<Utc>,
    pub current_bid: Option<Decimal>,
    pub offer_type: Option<String>,
    pub source_data: serde_json::Value,
    pub link: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Inserts a batch of already-validated listings into staging, tagged with
/// the caller's job id. One multi-row insert via `UNNEST` arrays.
///
/// Returns the number of rows written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails; in that case no rows from
/// the batch are written.
pub async fn insert_staging_batch(
    pool: &PgPool,
    job_id: Uuid,
    auction_site: &str,
    listings: &[RawListing],
) -> Result<u64, DbError> {
    if listings.is_empty() {
        return Ok(0);
    }

    let mut domains = Vec::with_capacity(listings.len());
    let mut start_dates = Vec::with_capacity(listings.len());
    let mut expirations = Vec::with_capacity(listings.len());
    let mut bids = Vec::with_capacity(listings.len());
    let mut offer_types = Vec::with_capacity(listings.len());
    let mut source_payloads = Vec::with_capacity(listings.len());
    let mut links = Vec::with_capacity(listings.len());

    for listing in listings {
        domains.push(listing.domain_name.clone());
        start_dates.push(listing.start_date);
        expirations.push(listing.expiration_date);
        bids.push(listing.current_bid);
        offer_types.push(listing.offer_type.clone());
        source_payloads.push(listing.source_data.to_string());
        links.push(listing.link.clone());
    }

    let result = sqlx::query(
        "INSERT INTO staging_listings \
             (job_id, auction_site, domain_name, start_date, expiration_date, \
              current_bid, offer_type, source_data, link) \
         SELECT $1, $2, t.domain_name, t.start_date, t.expiration_date, \
                t.current_bid, t.offer_type, t.source_data::jsonb, t.link \
         FROM UNNEST($3::text[], $4::timestamptz[], $5::timestamptz[], \
                     $6::numeric[], $7::text[], $8::text[], $9::text[]) \
              AS t(domain_name, start_date, expiration_date, current_bid, \
                   offer_type, source_data, link)",
    )
    .bind(job_id)
    .bind(auction_site)
    .bind(&domains)
    .bind(&start_dates)
    .bind(&expirations)
    .bind(&bids)
    .bind(&offer_types)
    .bind(&source_payloads)
    .bind(&links)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Counts pending staging rows for one job (optionally narrowed to a site).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_staging_rows(
    pool: &PgPool,
    job_id: Uuid,
    auction_site: Option<&str>,
) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM staging_listings \
         WHERE job_id = $1 AND ($2::TEXT IS NULL OR auction_site = $2)",
    )
    .bind(job_id)
    .bind(auction_site)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
