// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Per-key exponential backoff for failed reconciles.

use crate::constants::requeue::{BACKOFF_BASE_SECS, BACKOFF_MAX_SECS};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Counts consecutive failures per resource key.
/// A key's delay doubles with each failure until it reaches `max`.
#[derive(Debug)]
pub struct RetryTracker {
    base: Duration,
    max: Duration,
    failures: Mutex<HashMap<String, u32>>,
}

impl Default for RetryTracker {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(BACKOFF_BASE_SECS),
            Duration::from_secs(BACKOFF_MAX_SECS),
        )
    }
}

impl RetryTracker {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Record a failure for `key` and return how long to wait before retrying
    pub fn record_failure(&self, key: &str) -> Duration {
        let mut failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
        let count = failures.entry(key.to_string()).or_insert(0);
        *count = count.saturating_add(1);
        self.delay_for(*count)
    }

    /// Forget the failure history of `key`
    pub fn reset(&self, key: &str) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }

    pub fn failures(&self, key: &str) -> u32 {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    fn delay_for(&self, failures: u32) -> Duration {
        let factor = 1u32.checked_shl(failures.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }
}
