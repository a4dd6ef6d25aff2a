use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RequestCounts {
    pub total: u64,
    pub allowed: u64,
    pub throttled: u64,
}

/// Process-wide admission counters.
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    allowed: Arc<AtomicU64>,
    throttled: Arc<AtomicU64>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, allowed: bool) {
        let counter = if allowed { &self.allowed } else { &self.throttled };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RequestCounts {
        let allowed = self.allowed.load(Ordering::Relaxed);
        let throttled = self.throttled.load(Ordering::Relaxed);
        RequestCounts {
            total: allowed + throttled,
            allowed,
            throttled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_snapshot() {
        let metrics = MetricsCollector::new();
        metrics.record(true);
        metrics.record(true);
        metrics.clone().record(false);

        assert_eq!(
            metrics.snapshot(),
            RequestCounts {
                total: 3,
                allowed: 2,
                throttled: 1
            }
        );
    }
}
