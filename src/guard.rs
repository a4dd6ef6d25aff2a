use crate::config::Environment;
use crate::fixed_window::{now_millis, Decision};
use crate::metrics::MetricsCollector;
use crate::rate_limiter::RateLimiter;
use crate::route_policy::RoutePolicy;
use crate::security_headers::SecurityHeaders;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of gating a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// Carries the decision when the path was counted.
    Allowed(Option<Decision>),
    Denied(Decision),
}

/// Everything the security middleware needs per request.
#[derive(Clone)]
pub struct Guard {
    limiter: RateLimiter,
    policy: Arc<RoutePolicy>,
    headers: Arc<SecurityHeaders>,
    environment: Environment,
    metrics: MetricsCollector,
    rate_limiting: bool,
}

impl Guard {
    pub fn new(
        limiter: RateLimiter,
        policy: RoutePolicy,
        environment: Environment,
        rate_limiting: bool,
    ) -> Self {
        Self {
            limiter,
            policy: Arc::new(policy),
            headers: Arc::new(SecurityHeaders::for_environment(environment)),
            environment,
            metrics: MetricsCollector::new(),
            rate_limiting,
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn policy(&self) -> &RoutePolicy {
        &self.policy
    }

    pub fn headers(&self) -> &SecurityHeaders {
        &self.headers
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    pub fn rate_limiting(&self) -> bool {
        self.rate_limiting
    }

    pub async fn evaluate(&self, path: &str, client_id: &str) -> GateOutcome {
        self.evaluate_at(path, client_id, now_millis()).await
    }

    /// Decide whether the request may reach its handler. Store failures admit the request.
    pub async fn evaluate_at(&self, path: &str, client_id: &str, now: u64) -> GateOutcome {
        if !self.rate_limiting || !self.policy.applies_to(path) {
            return GateOutcome::Allowed(None);
        }

        let limit = self.policy.limit_for(path);
        match self.limiter.check_at(client_id, limit, now).await {
            Ok(decision) => {
                self.metrics.record(decision.allowed);
                if decision.allowed {
                    GateOutcome::Allowed(Some(decision))
                } else {
                    debug!(
                        target: "catalog_guard::guard",
                        client_id = %client_id,
                        path = %path,
                        limit,
                        "Rate limit exceeded"
                    );
                    GateOutcome::Denied(decision)
                }
            }
            Err(e) => {
                warn!(
                    target: "catalog_guard::guard",
                    client_id = %client_id,
                    error = %e,
                    "Rate limit store unavailable, admitting request"
                );
                GateOutcome::Allowed(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GuardError, Result};
    use crate::fixed_window::RateWindow;
    use crate::store::WindowStore;
    use async_trait::async_trait;
    use std::time::Duration;

    struct BrokenStore;

    #[async_trait]
    impl WindowStore for BrokenStore {
        async fn hit(&self, _: &str, _: u32, _: Duration, _: u64) -> Result<Decision> {
            Err(GuardError::Redis("connection refused".into()))
        }
        async fn window(&self, _: &str) -> Result<Option<RateWindow>> {
            Err(GuardError::Redis("connection refused".into()))
        }
        async fn reset(&self, _: &str) -> Result<()> {
            Ok(())
        }
        async fn tracked_clients(&self) -> Result<usize> {
            Ok(0)
        }
        async fn is_healthy(&self) -> bool {
            false
        }
        fn backend(&self) -> &'static str {
            "broken"
        }
    }

    fn guard(enabled: bool) -> Guard {
        Guard::new(
            RateLimiter::in_memory(500, Duration::from_secs(60)),
            RoutePolicy::default(),
            Environment::Production,
            enabled,
        )
    }

    #[tokio::test]
    async fn test_auth_route_limit() {
        let guard = guard(true);
        for _ in 0..5 {
            assert!(matches!(
                guard.evaluate_at("/api/auth/signin", "1.2.3.4", 0).await,
                GateOutcome::Allowed(Some(_))
            ));
        }
        match guard.evaluate_at("/api/auth/signin", "1.2.3.4", 10).await {
            GateOutcome::Denied(decision) => assert_eq!(decision.reset_at, Some(60_000)),
            other => panic!("expected denial, got {:?}", other),
        }
        assert_eq!(guard.metrics().snapshot().throttled, 1);
    }

    #[tokio::test]
    async fn test_non_api_paths_are_not_counted() {
        let guard = guard(true);
        assert_eq!(guard.evaluate_at("/cars", "c", 0).await, GateOutcome::Allowed(None));
        assert_eq!(guard.metrics().snapshot().total, 0);
    }

    #[tokio::test]
    async fn test_disabled_guard_admits_everything() {
        let guard = guard(false);
        for _ in 0..10 {
            assert_eq!(
                guard.evaluate_at("/api/auth", "c", 0).await,
                GateOutcome::Allowed(None)
            );
        }
    }

    #[tokio::test]
    async fn test_store_failure_fails_open() {
        let guard = Guard::new(
            RateLimiter::new(Arc::new(BrokenStore), Duration::from_secs(60)),
            RoutePolicy::default(),
            Environment::Production,
            true,
        );
        assert_eq!(
            guard.evaluate_at("/api/cars", "c", 0).await,
            GateOutcome::Allowed(None)
        );
    }
}
