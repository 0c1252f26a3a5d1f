//! Batch orchestration: staging import, filter + prescore, complex scoring,
//! and the bulk write-back.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use darp_core::{AppConfig, DomainName, RawListing};
use darp_db::{AuctionRow, ScoreUpdate, ScoringConfigRow};

use crate::{
    age::AgeCurve,
    filter::{FilterReason, FilterRules},
    lexical::WordFrequencyScorer,
    semantic::KeywordValueScorer,
    NameScorer, PipelineError,
};

/// Result of one scoring-batch invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Rows selected for this batch.
    pub total_fetched: u64,
    /// Rows newly marked processed by this call (pass and fail alike).
    pub processed_count: u64,
}

/// Result of one import (stage + merge) invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOutcome {
    pub inserted: u64,
    pub updated: u64,
    pub skipped: u64,
}

/// The scoring pipeline: filter rules, the age curve, and the two pluggable
/// name scorers. Stateless between invocations; every call is a synchronous
/// unit of work driven by HTTP or the CLI.
pub struct ScoringPipeline {
    filter_rules: FilterRules,
    age_curve: AgeCurve,
    lexical: Box<dyn NameScorer>,
    semantic: Box<dyn NameScorer>,
}

impl ScoringPipeline {
    #[must_use]
    pub fn new(
        filter_rules: FilterRules,
        age_curve: AgeCurve,
        lexical: Box<dyn NameScorer>,
        semantic: Box<dyn NameScorer>,
    ) -> Self {
        Self {
            filter_rules,
            age_curve,
            lexical,
            semantic,
        }
    }

    /// Builds the pipeline from app config with the default scorers.
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self::new(
            FilterRules::from_app_config(config),
            AgeCurve::new(config.age_halflife_days),
            Box::new(WordFrequencyScorer),
            Box::new(KeywordValueScorer),
        )
    }

    /// Evaluates one row: filter verdict, age prescore, and (for passers)
    /// the complex scores combined via the config's weights.
    ///
    /// Pure function of the row's immutable listing fields, the rules, and
    /// `now`; re-evaluating an unchanged row yields the identical verdict.
    #[must_use]
    pub fn evaluate_row(
        &self,
        row: &AuctionRow,
        config: &ScoringConfigRow,
        now: DateTime<Utc>,
    ) -> ScoreUpdate {
        let rejected = |reason: &str| ScoreUpdate {
            id: row.id,
            passed_filter: false,
            filter_reason: Some(reason.to_string()),
            age_score: None,
            lexical_frequency_score: None,
            semantic_value_score: None,
            total_score: None,
        };

        // A name that does not even split into label + TLD cannot be on
        // the allow-list.
        let Some(domain) = DomainName::parse(&row.domain_name) else {
            return rejected(FilterReason::Tld.as_str());
        };

        if let Err(reason) = self.filter_rules.evaluate(&domain) {
            return rejected(reason.as_str());
        }

        let listed_since = row.start_date.unwrap_or(row.first_seen_at);
        #[allow(clippy::cast_precision_loss)]
        let age_days = ((now - listed_since).num_seconds().max(0) as f64) / 86_400.0;
        let age_score = self.age_curve.score(age_days);
        let lexical_score = self.lexical.score(&domain.label).clamp(0.0, 100.0);
        let semantic_score = self.semantic.score(&domain.label).clamp(0.0, 100.0);

        let total_score = age_score * config.age_weight
            + lexical_score * config.lexical_weight
            + semantic_score * config.semantic_weight;

        ScoreUpdate {
            id: row.id,
            passed_filter: true,
            filter_reason: None,
            age_score: Some(age_score),
            lexical_frequency_score: Some(lexical_score),
            semantic_value_score: Some(semantic_score),
            total_score: Some(total_score),
        }
    }

    /// Runs one filter + scoring batch over up to `batch_size` unprocessed
    /// rows and writes the verdicts back in a single all-or-nothing bulk
    /// update.
    ///
    /// Invoke repeatedly until `total_fetched` reaches zero; duplicate
    /// selection across calls is an idempotent no-op.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Validation`] if the config's weights do not
    /// sum to 1.0, or a mapped store error if a query fails (no rows from
    /// the batch are committed in that case).
    pub async fn run_scoring_batch(
        &self,
        pool: &PgPool,
        config: &ScoringConfigRow,
        batch_size: i64,
    ) -> Result<BatchOutcome, PipelineError> {
        if !config.weights_normalized() {
            return Err(PipelineError::Validation(format!(
                "scoring config '{}' has weights that do not sum to 1.0",
                config.name
            )));
        }

        let rows = darp_db::fetch_unprocessed_batch(pool, batch_size).await?;
        if rows.is_empty() {
            return Ok(BatchOutcome {
                total_fetched: 0,
                processed_count: 0,
            });
        }

        let now = Utc::now();
        let updates: Vec<ScoreUpdate> = rows
            .iter()
            .map(|row| self.evaluate_row(row, config, now))
            .collect();

        let processed_count = darp_db::apply_score_updates(pool, &updates).await?;

        tracing::info!(
            total_fetched = rows.len(),
            processed_count,
            config = %config.name,
            "scoring batch complete"
        );

        Ok(BatchOutcome {
            total_fetched: rows.len() as u64,
            processed_count,
        })
    }

    /// Stages a batch of already-parsed listings under `job_id`, merges them
    /// into the main table, and records the outcome on the import job row.
    ///
    /// `skipped` is the number of records the parser rejected, carried
    /// through for the caller's response.
    ///
    /// # Errors
    ///
    /// Returns a mapped store error; the import job row is marked failed
    /// (best effort) and the job's staging rows are left for retry.
    pub async fn run_import(
        &self,
        pool: &PgPool,
        job_id: Uuid,
        auction_site: &str,
        listings: &[RawListing],
        skipped: u64,
    ) -> Result<ImportOutcome, PipelineError> {
        darp_db::create_import_job(pool, job_id, auction_site).await?;

        let outcome = self
            .stage_and_merge(pool, job_id, auction_site, listings)
            .await;

        match outcome {
            Ok(merge) => {
                darp_db::complete_import_job(
                    pool,
                    job_id,
                    i32::try_from(listings.len()).unwrap_or(i32::MAX),
                    i32::try_from(skipped).unwrap_or(i32::MAX),
                    i32::try_from(merge.inserted).unwrap_or(i32::MAX),
                    i32::try_from(merge.updated).unwrap_or(i32::MAX),
                )
                .await?;

                tracing::info!(
                    %job_id,
                    auction_site,
                    inserted = merge.inserted,
                    updated = merge.updated,
                    skipped,
                    "import merged"
                );

                Ok(ImportOutcome {
                    inserted: merge.inserted,
                    updated: merge.updated,
                    skipped,
                })
            }
            Err(e) => {
                if let Err(mark_err) = darp_db::fail_import_job(pool, job_id, &e.to_string()).await
                {
                    tracing::warn!(%job_id, error = %mark_err, "failed to mark import job failed");
                }
                Err(e)
            }
        }
    }

    async fn stage_and_merge(
        &self,
        pool: &PgPool,
        job_id: Uuid,
        auction_site: &str,
        listings: &[RawListing],
    ) -> Result<darp_db::MergeOutcome, PipelineError> {
        darp_db::insert_staging_batch(pool, job_id, auction_site, listings).await?;
        let merge = darp_db::merge_staging_job(pool, job_id, auction_site).await?;
        Ok(merge)
    }
}
