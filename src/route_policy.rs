use crate::error::{GuardError, Result};
use crate::rate_limiter::DEFAULT_WINDOW;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use validator::{Validate, ValidationError};

/// Paths under this prefix are subject to rate limiting.
pub const RATE_LIMITED_PREFIX: &str = "/api/";

pub const DEFAULT_LIMIT: u32 = 100;

/// Per-prefix request limits, immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RoutePolicy {
    #[validate(nested)]
    #[serde(default)]
    pub routes: Vec<RouteLimit>,
    #[validate(range(min = 1))]
    #[serde(default = "default_limit")]
    pub default_limit: u32,
    #[serde(with = "humantime_serde", default = "default_window")]
    pub window: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RouteLimit {
    #[validate(custom(function = "validate_prefix"))]
    pub prefix: String,
    #[validate(range(min = 1))]
    pub limit: u32,
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

fn default_window() -> Duration {
    DEFAULT_WINDOW
}

fn validate_prefix(prefix: &str) -> std::result::Result<(), ValidationError> {
    if prefix.starts_with('/') {
        Ok(())
    } else {
        Err(ValidationError::new("prefix_must_start_with_slash"))
    }
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self::new(
            vec![
                RouteLimit::new("/api/auth", 5),
                RouteLimit::new("/api/cars", 30),
                RouteLimit::new("/api/packs", 30),
                RouteLimit::new("/api/favorites", 30),
                RouteLimit::new("/api/lists", 30),
            ],
            DEFAULT_LIMIT,
            DEFAULT_WINDOW,
        )
    }
}

impl RouteLimit {
    pub fn new(prefix: impl Into<String>, limit: u32) -> Self {
        Self {
            prefix: prefix.into(),
            limit,
        }
    }
}

impl RoutePolicy {
    pub fn new(routes: Vec<RouteLimit>, default_limit: u32, window: Duration) -> Self {
        let mut policy = Self {
            routes,
            default_limit,
            window,
        };
        policy.order_routes();
        policy
    }

    /// Load and validate a JSON policy file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            GuardError::Configuration(format!(
                "Failed to read route policy {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let mut policy: RoutePolicy = serde_json::from_str(raw)
            .map_err(|e| GuardError::Configuration(format!("Invalid route policy: {}", e)))?;
        policy.validate()?;
        if policy.window.is_zero() {
            return Err(GuardError::Validation(
                "Route policy window must be greater than 0".to_string(),
            ));
        }
        policy.order_routes();
        Ok(policy)
    }

    /// Limit for `path`: the longest matching prefix, else the default.
    pub fn limit_for(&self, path: &str) -> u32 {
        self.routes
            .iter()
            .find(|route| path.starts_with(&route.prefix))
            .map(|route| route.limit)
            .unwrap_or(self.default_limit)
    }

    /// Whether requests to `path` are counted at all.
    pub fn applies_to(&self, path: &str) -> bool {
        path.starts_with(RATE_LIMITED_PREFIX)
    }

    fn order_routes(&mut self) {
        self.routes
            .sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
    }
}
