mod auctions;
mod configs;
mod imports;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use darp_scoring::{PipelineError, ScoringPipeline};

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<darp_core::AppConfig>,
    pub pipeline: Arc<ScoringPipeline>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "store_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(super) fn map_db_error(request_id: String, error: &darp_db::DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    match error {
        darp_db::DbError::NotFound => ApiError::new(request_id, "not_found", "record not found"),
        _ => ApiError::new(request_id, "internal_error", "database query failed"),
    }
}

pub(super) fn map_pipeline_error(request_id: String, error: &PipelineError) -> ApiError {
    tracing::error!(error = %error, code = error.code(), "pipeline stage failed");
    ApiError::new(request_id, error.code(), error.to_string())
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/auctions", get(auctions::list_auctions))
        .route(
            "/api/v1/auctions/process-scoring-batch",
            post(auctions::process_scoring_batch),
        )
        .route(
            "/api/v1/auctions/scoring-stats",
            get(auctions::scoring_stats),
        )
        .route(
            "/api/v1/auctions/recalculate-rankings",
            post(auctions::recalculate_rankings),
        )
        .route("/api/v1/imports/csv", post(imports::upload_csv))
        .route("/api/v1/imports/json", post(imports::upload_json))
        .route(
            "/api/v1/scoring-configs",
            get(configs::list_scoring_configs),
        )
        .route(
            "/api/v1/scoring-configs/{name}/activate",
            post(configs::activate_scoring_config),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match darp_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
mod tests {
    use super::auctions::{BatchData, RankingData, ScoringStatsData};
    use super::imports::ImportData;
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_state(pool: sqlx::PgPool) -> AppState {
        let config = test_app_config();
        let pipeline = Arc::new(ScoringPipeline::from_app_config(&config));
        AppState {
            pool,
            config: Arc::new(config),
            pipeline,
        }
    }

    fn test_app_config() -> darp_core::AppConfig {
        darp_core::AppConfig {
            database_url: "postgres://unused".to_string(),
            env: darp_core::Environment::Test,
            bind_addr: "127.0.0.1:3000".parse().expect("addr"),
            log_level: "info".to_string(),
            db_max_connections: 5,
            db_min_connections: 1,
            db_acquire_timeout_secs: 5,
            allowed_tlds: vec!["com".to_string(), "net".to_string(), "io".to_string()],
            min_name_length: 3,
            max_name_length: 63,
            allow_hyphens: true,
            allow_digits: true,
            age_halflife_days: 365.0,
            scoring_batch_size: 100,
        }
    }

    fn test_app(pool: sqlx::PgPool) -> Router {
        build_app(test_state(pool), AuthState::disabled(), default_rate_limit_state())
    }

    fn keyed_auth(keys: &[&str]) -> AuthState {
        AuthState::new(keys.iter().map(ToString::to_string).collect())
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&body).expect("json parse")
    }

    // -----------------------------------------------------------------------
    // Serialization unit tests (no DB)
    // -----------------------------------------------------------------------

    #[test]
    fn batch_data_is_serializable() {
        let data = BatchData {
            processed_count: 7,
            total_fetched: 10,
        };
        let json = serde_json::to_string(&data).expect("serialize");
        assert!(json.contains("\"processed_count\":7"));
        assert!(json.contains("\"total_fetched\":10"));
    }

    #[test]
    fn ranking_data_is_serializable() {
        let data = RankingData {
            ranked_count: 3,
            preferred_count: 1,
            execution_time_seconds: 0.25,
        };
        let json = serde_json::to_string(&data).expect("serialize");
        assert!(json.contains("\"ranked_count\":3"));
    }

    #[test]
    fn scoring_stats_data_is_serializable() {
        let data = ScoringStatsData {
            unprocessed_count: 1,
            processed_count: 2,
            scored_count: 2,
            total_count: 3,
        };
        let json = serde_json::to_string(&data).expect("serialize");
        assert!(json.contains("\"unprocessed_count\":1"));
    }

    #[test]
    fn import_data_is_serializable() {
        let data = ImportData {
            inserted: 2,
            updated: 1,
            skipped: 1,
            deleted_expired: 0,
        };
        let json = serde_json::to_string(&data).expect("serialize");
        assert!(json.contains("\"deleted_expired\":0"));
    }

    #[test]
    fn normalize_limit_applies_defaults_and_bounds() {
        assert_eq!(normalize_limit(None), 50);
        assert_eq!(normalize_limit(Some(0)), 1);
        assert_eq!(normalize_limit(Some(1_000)), 200);
        assert_eq!(normalize_limit(Some(25)), 25);
    }

    #[test]
    fn api_error_validation_error_maps_to_bad_request() {
        let response = ApiError::new("req-1", "validation_error", "invalid input").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn api_error_store_unavailable_maps_to_503() {
        let response = ApiError::new("req-1", "store_unavailable", "down").into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    // -----------------------------------------------------------------------
    // Route integration tests (with DB)
    // -----------------------------------------------------------------------

    const SCENARIO_CSV: &str = "\
domain,end_date,price
example1.com,2027-06-01,100.00
example2.xyz,2027-06-01,50.00
ex.com,2027-06-01,25.00
";

    async fn upload_scenario(app: &Router) -> serde_json::Value {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/imports/csv?auction_site=testsite")
                    .header("content-type", "text/csv")
                    .body(Body::from(SCENARIO_CSV))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn csv_upload_then_batch_then_ranking(pool: sqlx::PgPool) {
        let app = test_app(pool.clone());

        let upload = upload_scenario(&app).await;
        assert_eq!(upload["data"]["inserted"].as_i64(), Some(3));
        assert_eq!(upload["data"]["updated"].as_i64(), Some(0));
        assert_eq!(upload["data"]["skipped"].as_i64(), Some(0));

        // Run one scoring batch over all three rows.
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/auctions/process-scoring-batch?batch_size=10")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let batch = body_json(response).await;
        assert_eq!(batch["data"]["total_fetched"].as_i64(), Some(3));
        assert_eq!(batch["data"]["processed_count"].as_i64(), Some(3));

        // Only example1.com passed; verify verdicts directly.
        let rows = darp_db::list_auctions(&pool, 10, false).await.expect("list");
        let by_name = |name: &str| {
            rows.iter()
                .find(|r| r.domain_name == name)
                .unwrap_or_else(|| panic!("missing row {name}"))
        };
        let passer = by_name("example1.com");
        assert_eq!(passer.passed_filter, Some(true));
        assert!(passer.total_score.is_some());
        let bad_tld = by_name("example2.xyz");
        assert_eq!(bad_tld.passed_filter, Some(false));
        assert_eq!(bad_tld.filter_reason.as_deref(), Some("tld"));
        assert!(bad_tld.total_score.is_none());
        let too_short = by_name("ex.com");
        assert_eq!(too_short.filter_reason.as_deref(), Some("length"));

        // Ranking: only the passer gets a rank, and it is rank 1.
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/auctions/recalculate-rankings")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let ranking = body_json(response).await;
        assert_eq!(ranking["data"]["ranked_count"].as_i64(), Some(1));
        assert_eq!(ranking["data"]["preferred_count"].as_i64(), Some(1));

        let rows = darp_db::list_auctions(&pool, 10, false).await.expect("list");
        let passer = rows
            .iter()
            .find(|r| r.domain_name == "example1.com")
            .expect("passer");
        assert_eq!(passer.rank, Some(1));
        assert!(passer.preferred);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn scoring_stats_reflect_pipeline_progress(pool: sqlx::PgPool) {
        let app = test_app(pool.clone());
        upload_scenario(&app).await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/auctions/scoring-stats")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let stats = body_json(response).await;
        assert_eq!(stats["data"]["unprocessed_count"].as_i64(), Some(3));
        assert_eq!(stats["data"]["processed_count"].as_i64(), Some(0));
        assert_eq!(stats["data"]["total_count"].as_i64(), Some(3));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn re_upload_updates_rather_than_duplicates(pool: sqlx::PgPool) {
        let app = test_app(pool.clone());

        let first = upload_scenario(&app).await;
        assert_eq!(first["data"]["inserted"].as_i64(), Some(3));

        let second = upload_scenario(&app).await;
        assert_eq!(second["data"]["inserted"].as_i64(), Some(0));
        assert_eq!(second["data"]["updated"].as_i64(), Some(3));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn csv_without_domain_column_is_rejected(pool: sqlx::PgPool) {
        let app = test_app(pool);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/imports/csv?auction_site=testsite")
                    .header("content-type", "text/csv")
                    .body(Body::from("foo,bar\n1,2\n"))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"].as_str(), Some("validation_error"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn activate_unknown_config_returns_404(pool: sqlx::PgPool) {
        let app = test_app(pool);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/scoring-configs/nonexistent/activate")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn missing_token_gets_enveloped_unauthorized(pool: sqlx::PgPool) {
        let app = build_app(
            test_state(pool),
            keyed_auth(&["key-a"]),
            default_rate_limit_state(),
        );

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/auctions/scoring-stats")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"].as_str(), Some("unauthorized"));
        // Middleware rejections carry the same envelope as handler errors.
        assert!(json["meta"]["request_id"].is_string());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn rate_limit_is_tracked_per_bearer_token(pool: sqlx::PgPool) {
        let app = build_app(
            test_state(pool),
            keyed_auth(&["key-a", "key-b"]),
            RateLimitState::new(1, Duration::from_secs(60)),
        );

        let stats_as = |token: &str| {
            let app = app.clone();
            let authorization = format!("Bearer {token}");
            async move {
                app.oneshot(
                    Request::builder()
                        .uri("/api/v1/auctions/scoring-stats")
                        .header(header::AUTHORIZATION, authorization)
                        .body(Body::empty())
                        .expect("request"),
                )
                .await
                .expect("response")
                .status()
            }
        };

        assert_eq!(stats_as("key-a").await, StatusCode::OK);
        assert_eq!(stats_as("key-a").await, StatusCode::TOO_MANY_REQUESTS);
        // One exhausted client must not throttle another.
        assert_eq!(stats_as("key-b").await, StatusCode::OK);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn list_scoring_configs_includes_seeded_default(pool: sqlx::PgPool) {
        let app = test_app(pool);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/scoring-configs")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let data = json["data"].as_array().expect("data array");
        let default = data
            .iter()
            .find(|c| c["name"] == "default")
            .expect("default config seeded");
        assert_eq!(default["is_active"].as_bool(), Some(true));
    }
}
