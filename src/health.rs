use crate::guard::Guard;
use crate::response::{HealthResponse, StoreHealth};
use std::sync::LazyLock;
use std::time::Instant;
use tracing::warn;

static START_TIME: LazyLock<Instant> = LazyLock::new(Instant::now);

/// Mark the process start; uptime is measured from the first call.
pub fn mark_started() {
    LazyLock::force(&START_TIME);
}

pub struct HealthChecker {
    guard: Guard,
}

impl HealthChecker {
    pub fn new(guard: Guard) -> Self {
        Self { guard }
    }

    pub async fn check_health(&self) -> HealthResponse {
        let store = self.guard.limiter().store();
        let healthy = store.is_healthy().await;

        let tracked_clients = match store.tracked_clients().await {
            Ok(count) => Some(count),
            Err(e) => {
                warn!(target: "catalog_guard::health", error = %e, "Failed to count tracked clients");
                None
            }
        };

        HealthResponse {
            status: if healthy { "healthy" } else { "unhealthy" },
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime_seconds: START_TIME.elapsed().as_secs(),
            environment: self.guard.environment().to_string(),
            version: env!("CARGO_PKG_VERSION"),
            rate_limiting: self.guard.rate_limiting(),
            store: StoreHealth {
                backend: store.backend(),
                healthy,
                tracked_clients,
            },
            requests: self.guard.metrics().snapshot(),
        }
    }
}
