use crate::error::Result;
use crate::fixed_window::{now_millis, Decision, RateWindow};
use crate::store::{window_ms, MemoryStore, WindowStore};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Default counting window.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Fixed-window limiter over a pluggable [`WindowStore`].
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn WindowStore>,
    window: Duration,
}

/// Read-only view of a client's window.
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitStatus {
    pub client_id: String,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: Option<u64>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn WindowStore>, window: Duration) -> Self {
        Self { store, window }
    }

    /// In-memory limiter holding at most `capacity` clients.
    pub fn in_memory(capacity: usize, window: Duration) -> Self {
        Self::new(Arc::new(MemoryStore::new(capacity)), window)
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn store(&self) -> &Arc<dyn WindowStore> {
        &self.store
    }

    /// Check and record one request for `client_id` against `limit`.
    pub async fn check(&self, client_id: &str, limit: u32) -> Result<Decision> {
        self.check_at(client_id, limit, now_millis()).await
    }

    pub async fn check_at(&self, client_id: &str, limit: u32, now: u64) -> Result<Decision> {
        self.store.hit(client_id, limit, self.window, now).await
    }

    /// Report the current window for `client_id` without counting a request.
    pub async fn status(&self, client_id: &str, limit: u32) -> Result<RateLimitStatus> {
        self.status_at(client_id, limit, now_millis()).await
    }

    pub async fn status_at(
        &self,
        client_id: &str,
        limit: u32,
        now: u64,
    ) -> Result<RateLimitStatus> {
        let window_ms = window_ms(self.window);
        let live = self
            .store
            .window(client_id)
            .await?
            .filter(|window: &RateWindow| !window.is_expired(window_ms, now));

        Ok(match live {
            Some(window) => RateLimitStatus {
                client_id: client_id.to_string(),
                limit,
                remaining: limit.saturating_sub(window.count),
                reset_at: Some(window.reset_at(window_ms)),
            },
            None => RateLimitStatus {
                client_id: client_id.to_string(),
                limit,
                remaining: limit,
                reset_at: None,
            },
        })
    }

    pub async fn reset(&self, client_id: &str) -> Result<()> {
        self.store.reset(client_id).await
    }
}
