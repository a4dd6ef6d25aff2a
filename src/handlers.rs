use crate::client_identity::client_id;
use crate::error::GuardError;
use crate::guard::Guard;
use crate::health::HealthChecker;
use crate::rate_limiter::RateLimitStatus;
use axum::extract::{Query, Request, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    /// Route whose limit to report against; defaults to this endpoint.
    pub path: Option<String>,
}

/// Health check endpoint
pub async fn health_check(State(guard): State<Guard>) -> impl IntoResponse {
    HealthChecker::new(guard).check_health().await
}

/// The caller's own counting window, measured against the limit of `?path=`.
pub async fn rate_limit_status(
    State(guard): State<Guard>,
    Query(query): Query<StatusQuery>,
    request: Request,
) -> Result<Json<RateLimitStatus>, GuardError> {
    let path = query
        .path
        .unwrap_or_else(|| request.uri().path().to_string());
    if !path.starts_with('/') {
        return Err(GuardError::InvalidRequest(
            "path must start with '/'".to_string(),
        ));
    }

    let client = client_id(&request);
    let limit = guard.policy().limit_for(&path);
    let status = guard.limiter().status(&client, limit).await?;
    Ok(Json(status))
}

pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Not found" })),
    )
}
