//! Window storage backends.

use crate::error::{GuardError, Result};
use crate::fixed_window::{admit, Decision, RateWindow};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// Default bound on distinct client identifiers held in memory.
pub const DEFAULT_MAX_TRACKED_CLIENTS: usize = 500;

/// Storage for per-client counting windows.
///
/// `hit` must apply [`admit`] atomically for a single client identifier so that
/// two concurrent requests never observe the same count.
#[async_trait]
pub trait WindowStore: Send + Sync {
    /// Record one request for `client_id` and return the admission decision.
    async fn hit(&self, client_id: &str, limit: u32, window: Duration, now: u64)
        -> Result<Decision>;

    /// Current window for `client_id`, if any.
    async fn window(&self, client_id: &str) -> Result<Option<RateWindow>>;

    /// Forget `client_id` entirely.
    async fn reset(&self, client_id: &str) -> Result<()>;

    /// Number of client identifiers currently held.
    async fn tracked_clients(&self) -> Result<usize>;

    async fn is_healthy(&self) -> bool;

    fn backend(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    window: RateWindow,
    last_seen: u64,
}

/// Process-local store bounded to `capacity` client identifiers.
///
/// At capacity, a previously unseen client first triggers a sweep of expired
/// windows and, if that frees nothing, evicts the least recently seen client.
pub struct MemoryStore {
    slots: Mutex<HashMap<String, Slot>>,
    capacity: usize,
}

impl MemoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every window older than `window`. Returns how many were removed.
    pub fn sweep_expired(&self, window: Duration, now: u64) -> Result<usize> {
        let mut slots = self.lock()?;
        Ok(Self::sweep(&mut slots, window_ms(window), now))
    }

    fn sweep(slots: &mut HashMap<String, Slot>, window_ms: u64, now: u64) -> usize {
        let before = slots.len();
        slots.retain(|_, slot| !slot.window.is_expired(window_ms, now));
        before - slots.len()
    }

    fn make_room(&self, slots: &mut HashMap<String, Slot>, window_ms: u64, now: u64) {
        if slots.len() < self.capacity {
            return;
        }

        let swept = Self::sweep(slots, window_ms, now);
        if swept > 0 {
            debug!(target: "catalog_guard::store", swept, "Swept expired windows at capacity");
        }

        while slots.len() >= self.capacity {
            let oldest = slots
                .iter()
                .min_by_key(|(_, slot)| slot.last_seen)
                .map(|(key, _)| key.clone());

            match oldest {
                Some(key) => {
                    debug!(target: "catalog_guard::store", client_id = %key, "Evicting least recently seen client");
                    slots.remove(&key);
                }
                None => break,
            }
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Slot>>> {
        self.slots
            .lock()
            .map_err(|_| GuardError::Internal("Failed to acquire lock on window store".to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TRACKED_CLIENTS)
    }
}

#[async_trait]
impl WindowStore for MemoryStore {
    async fn hit(
        &self,
        client_id: &str,
        limit: u32,
        window: Duration,
        now: u64,
    ) -> Result<Decision> {
        let window_ms = window_ms(window);
        let mut slots = self.lock()?;

        if !slots.contains_key(client_id) {
            self.make_room(&mut slots, window_ms, now);
        }

        let mut current = slots.get(client_id).map(|slot| slot.window);
        let decision = admit(&mut current, limit, window_ms, now);

        if let Some(window) = current {
            slots.insert(
                client_id.to_string(),
                Slot {
                    window,
                    last_seen: now,
                },
            );
        }

        Ok(decision)
    }

    async fn window(&self, client_id: &str) -> Result<Option<RateWindow>> {
        Ok(self.lock()?.get(client_id).map(|slot| slot.window))
    }

    async fn reset(&self, client_id: &str) -> Result<()> {
        self.lock()?.remove(client_id);
        Ok(())
    }

    async fn tracked_clients(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    async fn is_healthy(&self) -> bool {
        self.slots.lock().is_ok()
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

pub(crate) fn window_ms(window: Duration) -> u64 {
    (window.as_millis() as u64).max(1)
}
