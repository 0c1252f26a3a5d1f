use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use serde::Serialize;

use darp_db::ScoringConfigRow;

use super::{map_db_error, ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

#[derive(Debug, Serialize)]
pub(super) struct ScoringConfigData {
    pub name: String,
    pub age_weight: f64,
    pub lexical_weight: f64,
    pub semantic_weight: f64,
    pub preferred_rank_threshold: i32,
    pub is_active: bool,
}

impl From<ScoringConfigRow> for ScoringConfigData {
    fn from(row: ScoringConfigRow) -> Self {
        Self {
            name: row.name,
            age_weight: row.age_weight,
            lexical_weight: row.lexical_weight,
            semantic_weight: row.semantic_weight,
            preferred_rank_threshold: row.preferred_rank_threshold,
            is_active: row.is_active,
        }
    }
}

/// `GET /api/v1/scoring-configs`. Active config first.
pub(super) async fn list_scoring_configs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    match darp_db::list_scoring_configs(&state.pool).await {
        Ok(rows) => {
            let data: Vec<ScoringConfigData> =
                rows.into_iter().map(ScoringConfigData::from).collect();
            Ok(Json(ApiResponse {
                data,
                meta: ResponseMeta::new(req_id.0),
            }))
        }
        Err(e) => Err(map_db_error(req_id.0, &e)),
    }
}

/// `POST /api/v1/scoring-configs/{name}/activate`. Deactivates the current
/// config and activates the named one in a single transaction.
pub(super) async fn activate_scoring_config(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match darp_db::activate_scoring_config(&state.pool, &name).await {
        Ok(()) => {
            tracing::info!(config = %name, "scoring config activated");
            match darp_db::get_scoring_config_by_name(&state.pool, &name).await {
                Ok(Some(row)) => Ok(Json(ApiResponse {
                    data: ScoringConfigData::from(row),
                    meta: ResponseMeta::new(req_id.0),
                })),
                Ok(None) => Err(map_db_error(req_id.0, &darp_db::DbError::NotFound)),
                Err(e) => Err(map_db_error(req_id.0, &e)),
            }
        }
        Err(e) => Err(map_db_error(req_id.0, &e)),
    }
}
