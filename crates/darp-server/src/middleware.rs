//! Request middleware: request-id propagation, bearer auth, and a
//! per-client rate limiter.
//!
//! Error responses use the same `{error: {code, message}, meta}` envelope
//! as the handlers, so consumers never see two error shapes.

use std::{
    collections::{HashMap, HashSet},
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::AUTHORIZATION, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::ApiError;

const X_REQUEST_ID: &str = "x-request-id";

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Bearer-token auth settings used by [`require_bearer_auth`].
#[derive(Debug, Clone)]
pub struct AuthState {
    api_keys: Arc<HashSet<String>>,
    pub enabled: bool,
}

impl AuthState {
    /// Builds auth from an explicit key set; empty keys disable auth.
    #[must_use]
    pub fn new(api_keys: HashSet<String>) -> Self {
        let enabled = !api_keys.is_empty();
        Self {
            api_keys: Arc::new(api_keys),
            enabled,
        }
    }

    /// Auth switched off entirely. Development and tests only.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(HashSet::new())
    }

    /// Reads `DARP_API_KEYS` (comma-separated bearer tokens) and delegates
    /// to [`AuthState::new`].
    ///
    /// In development, empty/missing keys disable auth for local
    /// iteration. In non-development envs, empty/missing keys fail
    /// startup.
    pub fn from_env(is_development: bool) -> anyhow::Result<Self> {
        let raw = std::env::var("DARP_API_KEYS").unwrap_or_default();
        let keys: HashSet<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToOwned::to_owned)
            .collect();

        if keys.is_empty() {
            if is_development {
                tracing::warn!("DARP_API_KEYS not set; bearer auth disabled in development");
                return Ok(Self::disabled());
            }
            anyhow::bail!(
                "DARP_API_KEYS is required outside development; provide comma-separated bearer tokens"
            );
        }

        Ok(Self::new(keys))
    }

    fn allows(&self, token: &str) -> bool {
        self.api_keys.contains(token)
    }
}

#[derive(Debug, Clone, Copy)]
struct RateLimitWindow {
    started_at: Instant,
    count: usize,
}

/// Upper bound on tracked clients; stale windows are pruned past this so
/// a churn of one-shot peers cannot grow the map without bound.
const MAX_TRACKED_CLIENTS: usize = 1024;

/// Fixed-window rate limiter with one window per client.
///
/// Clients are keyed by bearer token when the request carries one, else by
/// peer IP, so one noisy importer cannot starve the others.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    windows: Arc<Mutex<HashMap<String, RateLimitWindow>>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Counts one request against `key`'s current window. Returns `false`
    /// when the window is exhausted.
    async fn try_acquire(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;

        if windows.len() >= MAX_TRACKED_CLIENTS {
            windows.retain(|_, w| now.duration_since(w.started_at) < self.window);
        }

        let window = windows.entry(key.to_string()).or_insert(RateLimitWindow {
            started_at: now,
            count: 0,
        });

        if now.duration_since(window.started_at) >= self.window {
            window.started_at = now;
            window.count = 0;
        }

        if window.count >= self.max_requests {
            return false;
        }
        window.count += 1;
        true
    }
}

/// Axum middleware that extracts or generates a request ID.
///
/// An incoming `x-request-id` header is reused; otherwise a fresh UUIDv4
/// is generated. The ID is inserted into request extensions as
/// [`RequestId`] and echoed on the response header.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = match req.headers().get(X_REQUEST_ID).and_then(|v| v.to_str().ok()) {
        Some(existing) => existing.to_string(),
        None => Uuid::new_v4().to_string(),
    };

    req.extensions_mut().insert(RequestId(id.clone()));
    let mut res = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        res.headers_mut().insert(X_REQUEST_ID, value);
    }
    res
}

/// Middleware enforcing bearer-token auth when enabled.
pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    if !auth.enabled {
        return next.run(req).await;
    }

    match extract_bearer_token(req.headers().get(AUTHORIZATION)) {
        Some(token) if auth.allows(token) => next.run(req).await,
        _ => ApiError::new(
            request_id_of(&req),
            "unauthorized",
            "missing or invalid bearer token",
        )
        .into_response(),
    }
}

/// Middleware enforcing the per-client fixed-window limit.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let key = client_key(&req);
    if rate_limit.try_acquire(&key).await {
        return next.run(req).await;
    }

    ApiError::new(request_id_of(&req), "rate_limited", "rate limit exceeded").into_response()
}

/// The limiter key for one request: the bearer token when present, else
/// the peer IP, else a shared bucket for peers the listener cannot name.
fn client_key(req: &Request) -> String {
    if let Some(token) = extract_bearer_token(req.headers().get(AUTHORIZATION)) {
        return format!("token:{token}");
    }
    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return format!("peer:{}", addr.ip());
    }
    "peer:unknown".to_string()
}

fn request_id_of(req: &Request) -> String {
    req.extensions()
        .get::<RequestId>()
        .map_or_else(|| Uuid::new_v4().to_string(), |id| id.0.clone())
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|s| !s.trim().is_empty())
}
