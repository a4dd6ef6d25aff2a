use crate::fixed_window::Decision;
use crate::metrics::RequestCounts;
use axum::http::header::{HeaderValue, CACHE_CONTROL, EXPIRES, PRAGMA, RETRY_AFTER};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

pub const RATE_LIMIT_MESSAGE: &str = "Rate limit exceeded";

#[derive(Debug, Serialize)]
pub struct RateLimitedBody {
    pub error: &'static str,
}

/// 429 response for a denied decision, with `Retry-After` in whole seconds.
pub fn rate_limited(decision: &Decision, now: u64) -> Response {
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(RateLimitedBody {
            error: RATE_LIMIT_MESSAGE,
        }),
    )
        .into_response();

    response.headers_mut().insert(
        RETRY_AFTER,
        HeaderValue::from(decision.retry_after_secs(now)),
    );
    response
}

/// `X-RateLimit-*` headers for an admitted, counted request.
pub fn insert_rate_limit_headers(headers: &mut HeaderMap, decision: &Decision) {
    headers.insert("x-ratelimit-limit", HeaderValue::from(decision.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining()));
}

#[derive(Debug, Serialize)]
pub struct StoreHealth {
    pub backend: &'static str,
    pub healthy: bool,
    pub tracked_clients: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub uptime_seconds: u64,
    pub environment: String,
    pub version: &'static str,
    pub rate_limiting: bool,
    pub store: StoreHealth,
    pub requests: RequestCounts,
}

impl HealthResponse {
    pub fn is_healthy(&self) -> bool {
        self.store.healthy
    }
}

impl IntoResponse for HealthResponse {
    fn into_response(self) -> Response {
        let status = if self.is_healthy() {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };

        let mut response = (status, Json(self)).into_response();
        let headers = response.headers_mut();
        headers.insert(
            CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate"),
        );
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert(EXPIRES, HeaderValue::from_static("0"));
        response
    }
}
