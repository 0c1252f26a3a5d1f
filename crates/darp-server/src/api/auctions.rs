use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use darp_db::AuctionRow;

use super::{map_db_error, map_pipeline_error, normalize_limit, ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

#[derive(Debug, Deserialize)]
pub(super) struct BatchQuery {
    batch_size: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ListQuery {
    limit: Option<i64>,
    #[serde(default)]
    preferred_only: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct BatchData {
    pub processed_count: u64,
    pub total_fetched: u64,
}

#[derive(Debug, Serialize)]
pub(super) struct RankingData {
    pub ranked_count: u64,
    pub preferred_count: u64,
    pub execution_time_seconds: f64,
}

#[derive(Debug, Serialize)]
pub(super) struct ScoringStatsData {
    pub unprocessed_count: i64,
    pub processed_count: i64,
    pub scored_count: i64,
    pub total_count: i64,
}

#[derive(Debug, Serialize)]
pub(super) struct AuctionData {
    pub id: i64,
    pub domain_name: String,
    pub auction_site: String,
    pub start_date: Option<DateTime<Utc>>,
    pub expiration_date: DateTime<Utc>,
    pub current_bid: Option<Decimal>,
    pub offer_type: Option<String>,
    pub link: Option<String>,
    pub processed: bool,
    pub passed_filter: Option<bool>,
    pub filter_reason: Option<String>,
    pub age_score: Option<f64>,
    pub lexical_frequency_score: Option<f64>,
    pub semantic_value_score: Option<f64>,
    pub total_score: Option<f64>,
    pub rank: Option<i32>,
    pub preferred: bool,
}

impl From<AuctionRow> for AuctionData {
    fn from(row: AuctionRow) -> Self {
        Self {
            id: row.id,
            domain_name: row.domain_name,
            auction_site: row.auction_site,
            start_date: row.start_date,
            expiration_date: row.expiration_date,
            current_bid: row.current_bid,
            offer_type: row.offer_type,
            link: row.link,
            processed: row.processed,
            passed_filter: row.passed_filter,
            filter_reason: row.filter_reason,
            age_score: row.age_score,
            lexical_frequency_score: row.lexical_frequency_score,
            semantic_value_score: row.semantic_value_score,
            total_score: row.total_score,
            rank: row.rank,
            preferred: row.preferred,
        }
    }
}

/// `GET /api/v1/auctions` with optional `limit` and `preferred_only`.
pub(super) async fn list_auctions(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let limit = normalize_limit(query.limit);

    match darp_db::list_auctions(&state.pool, limit, query.preferred_only).await {
        Ok(rows) => {
            let data: Vec<AuctionData> = rows.into_iter().map(AuctionData::from).collect();
            Ok(Json(ApiResponse {
                data,
                meta: ResponseMeta::new(req_id.0),
            }))
        }
        Err(e) => Err(map_db_error(req_id.0, &e)),
    }
}

/// `POST /api/v1/auctions/process-scoring-batch`. Scores one batch of
/// unprocessed rows under the active config; `batch_size` defaults to the
/// configured value.
pub(super) async fn process_scoring_batch(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<BatchQuery>,
) -> impl IntoResponse {
    let batch_size = query
        .batch_size
        .unwrap_or(state.config.scoring_batch_size)
        .clamp(1, 10_000);

    let config = match darp_db::get_active_scoring_config(&state.pool).await {
        Ok(config) => config,
        Err(e) => return Err(map_db_error(req_id.0, &e)),
    };

    match state
        .pipeline
        .run_scoring_batch(&state.pool, &config, batch_size)
        .await
    {
        Ok(outcome) => Ok(Json(ApiResponse {
            data: BatchData {
                processed_count: outcome.processed_count,
                total_fetched: outcome.total_fetched,
            },
            meta: ResponseMeta::new(req_id.0),
        })),
        Err(e) => Err(map_pipeline_error(req_id.0, &e)),
    }
}

/// `GET /api/v1/auctions/scoring-stats`.
pub(super) async fn scoring_stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    match darp_db::scoring_stats(&state.pool).await {
        Ok(stats) => Ok(Json(ApiResponse {
            data: ScoringStatsData {
                unprocessed_count: stats.unprocessed_count,
                processed_count: stats.processed_count,
                scored_count: stats.scored_count,
                total_count: stats.total_count,
            },
            meta: ResponseMeta::new(req_id.0),
        })),
        Err(e) => Err(map_db_error(req_id.0, &e)),
    }
}

/// `POST /api/v1/auctions/recalculate-rankings`. Recomputes dense ranks and
/// preferred flags for every scored row under the active config's threshold.
pub(super) async fn recalculate_rankings(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let config = match darp_db::get_active_scoring_config(&state.pool).await {
        Ok(config) => config,
        Err(e) => return Err(map_db_error(req_id.0, &e)),
    };

    match darp_db::recalculate_rankings(&state.pool, config.preferred_rank_threshold).await {
        Ok(outcome) => {
            tracing::info!(
                ranked = outcome.ranked_count,
                preferred = outcome.preferred_count,
                elapsed_secs = outcome.execution_time_seconds,
                "ranking pass complete"
            );
            Ok(Json(ApiResponse {
                data: RankingData {
                    ranked_count: outcome.ranked_count,
                    preferred_count: outcome.preferred_count,
                    execution_time_seconds: outcome.execution_time_seconds,
                },
                meta: ResponseMeta::new(req_id.0),
            }))
        }
        Err(e) => Err(map_db_error(req_id.0, &e)),
    }
}
