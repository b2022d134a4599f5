// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Keyed leaky-bucket rate limiter.
//!
//! One bucket per key (agent target or notifier channel). Tokens refill
//! continuously at `per_minute / 60` per second up to the burst
//! capacity of `per_minute`.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Leaky-bucket limiter shared across tasks.
#[derive(Clone)]
pub struct RateLimiter {
    per_minute: u32,
    buckets: Arc<Mutex<HashMap<String, Bucket>>>,
}

impl RateLimiter {
    pub fn new(per_minute: u32) -> Self {
        Self {
            per_minute,
            buckets: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Take one token for `key` at time `now`. Returns false when the
    /// bucket is dry.
    pub fn try_acquire(&self, key: &str, now: Instant) -> bool {
        let mut buckets = self.buckets.lock();
        let bucket = buckets.entry(key.to_string()).or_insert(Bucket {
            tokens: self.per_minute as f64,
            last_refill: now,
        });

        let elapsed = now.saturating_duration_since(bucket.last_refill);
        let refill = elapsed.as_secs_f64() * (self.per_minute as f64 / 60.0);
        bucket.tokens = (bucket.tokens + refill).min(self.per_minute as f64);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
#[path = "ratelimit_tests.rs"]
mod tests;
