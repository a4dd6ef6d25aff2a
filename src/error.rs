use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Redis error: {0}")]
    Redis(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, GuardError>;

impl From<redis::RedisError> for GuardError {
    fn from(err: redis::RedisError) -> Self {
        GuardError::Redis(err.to_string())
    }
}

impl From<validator::ValidationErrors> for GuardError {
    fn from(err: validator::ValidationErrors) -> Self {
        GuardError::Validation(err.to_string())
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub code: u16,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str, code: u16) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
            code,
        }
    }

    pub fn from_guard_error(err: &GuardError) -> Self {
        match err {
            GuardError::InvalidRequest(msg) => Self::new("bad_request", msg, 400),
            GuardError::Redis(msg) => Self::new("service_unavailable", msg, 503),
            GuardError::Configuration(msg) => Self::new("configuration_error", msg, 500),
            GuardError::Validation(msg) => Self::new("validation_error", msg, 422),
            GuardError::Internal(msg) => Self::new("internal_error", msg, 500),
        }
    }
}

impl IntoResponse for GuardError {
    fn into_response(self) -> Response {
        let body = ErrorResponse::from_guard_error(&self);
        let status =
            StatusCode::from_u16(body.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(body)).into_response()
    }
}
