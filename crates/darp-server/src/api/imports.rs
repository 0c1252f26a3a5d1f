use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use darp_scoring::{parse_csv, parse_json, ParsedBatch};

use super::{map_pipeline_error, ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

#[derive(Debug, Deserialize)]
pub(super) struct ImportQuery {
    auction_site: String,
    offering_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct ImportData {
    pub inserted: u64,
    pub updated: u64,
    pub skipped: u64,
    pub deleted_expired: u64,
}

/// `POST /api/v1/imports/csv?auction_site=S[&offering_type=T]` with the raw
/// CSV export as the request body.
pub(super) async fn upload_csv(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ImportQuery>,
    body: String,
) -> impl IntoResponse {
    let batch = match parse_csv(&body, query.offering_type.as_deref()) {
        Ok(batch) => batch,
        Err(e) => return Err(map_pipeline_error(req_id.0, &e)),
    };
    run_import(state, req_id, &query.auction_site, batch).await
}

/// `POST /api/v1/imports/json?auction_site=S[&offering_type=T]` with either a
/// top-level array or a `{"listings": [...]}` object as the request body.
pub(super) async fn upload_json(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ImportQuery>,
    body: String,
) -> impl IntoResponse {
    let batch = match parse_json(&body, query.offering_type.as_deref()) {
        Ok(batch) => batch,
        Err(e) => return Err(map_pipeline_error(req_id.0, &e)),
    };
    run_import(state, req_id, &query.auction_site, batch).await
}

async fn run_import(
    state: AppState,
    req_id: RequestId,
    auction_site: &str,
    batch: ParsedBatch,
) -> Result<Json<ApiResponse<ImportData>>, super::ApiError> {
    let job_id = Uuid::new_v4();
    let skipped = batch.skipped.len() as u64;
    for record in &batch.skipped {
        tracing::debug!(
            %job_id,
            record = record.record,
            reason = %record.reason,
            "skipped import record"
        );
    }

    let outcome = state
        .pipeline
        .run_import(&state.pool, job_id, auction_site, &batch.listings, skipped)
        .await
        .map_err(|e| map_pipeline_error(req_id.0.clone(), &e))?;

    // Expired listings are swept after every import in addition to the
    // nightly job, so a fresh upload never reports stale inventory.
    let deleted_expired = darp_db::delete_expired_auctions(&state.pool)
        .await
        .map_err(|e| super::map_db_error(req_id.0.clone(), &e))?;

    tracing::info!(
        %job_id,
        auction_site,
        inserted = outcome.inserted,
        updated = outcome.updated,
        skipped = outcome.skipped,
        deleted_expired,
        "import complete"
    );

    Ok(Json(ApiResponse {
        data: ImportData {
            inserted: outcome.inserted,
            updated: outcome.updated,
            skipped: outcome.skipped,
            deleted_expired,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
