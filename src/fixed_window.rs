//! Fixed-window request counting.
//!
//! A client owns at most one [`RateWindow`]. The first request opens a window,
//! later requests increment its count until `limit` is reached, and the first
//! request after the window has elapsed replaces it with a fresh one. Bursts of
//! up to `2 * limit` requests straddling a window boundary are admitted.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// One client's current counting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateWindow {
    pub count: u32,
    /// Epoch milliseconds at which the window opened.
    pub window_start: u64,
}

impl RateWindow {
    pub fn new(now: u64) -> Self {
        Self {
            count: 1,
            window_start: now,
        }
    }

    pub fn reset_at(&self, window_ms: u64) -> u64 {
        self.window_start.saturating_add(window_ms)
    }

    pub fn is_expired(&self, window_ms: u64, now: u64) -> bool {
        now.saturating_sub(self.window_start) > window_ms
    }
}

/// Outcome of a single admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub allowed: bool,
    pub count: u32,
    pub limit: u32,
    /// Only set on denial.
    pub reset_at: Option<u64>,
}

impl Decision {
    pub fn allowed(count: u32, limit: u32) -> Self {
        Self {
            allowed: true,
            count,
            limit,
            reset_at: None,
        }
    }

    pub fn denied(count: u32, limit: u32, reset_at: u64) -> Self {
        Self {
            allowed: false,
            count,
            limit,
            reset_at: Some(reset_at),
        }
    }

    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.count)
    }

    /// Whole seconds until `reset_at`, rounded up.
    pub fn retry_after_secs(&self, now: u64) -> u64 {
        match self.reset_at {
            Some(reset_at) => reset_at.saturating_sub(now).div_ceil(1000),
            None => 0,
        }
    }
}

/// Apply one request to `slot`, opening, advancing or refusing the window.
pub fn admit(slot: &mut Option<RateWindow>, limit: u32, window_ms: u64, now: u64) -> Decision {
    let limit = limit.max(1);
    let window_ms = window_ms.max(1);

    match slot {
        Some(window) if !window.is_expired(window_ms, now) => {
            if window.count < limit {
                window.count += 1;
                Decision::allowed(window.count, limit)
            } else {
                Decision::denied(window.count, limit, window.reset_at(window_ms))
            }
        }
        _ => {
            *slot = Some(RateWindow::new(now));
            Decision::allowed(1, limit)
        }
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
