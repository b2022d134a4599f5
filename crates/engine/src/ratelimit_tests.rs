// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

#[test]
fn burst_up_to_capacity_then_dry() {
    let limiter = RateLimiter::new(10);
    let now = Instant::now();

    for _ in 0..10 {
        assert!(limiter.try_acquire("a", now));
    }
    assert!(!limiter.try_acquire("a", now));
}

#[test]
fn tokens_refill_over_time() {
    let limiter = RateLimiter::new(10);
    let start = Instant::now();

    for _ in 0..10 {
        limiter.try_acquire("a", start);
    }
    assert!(!limiter.try_acquire("a", start));

    // 6 seconds refills one token at 10/minute
    assert!(limiter.try_acquire("a", start + Duration::from_secs(7)));
    assert!(!limiter.try_acquire("a", start + Duration::from_secs(7)));
}

#[test]
fn keys_are_independent() {
    let limiter = RateLimiter::new(1);
    let now = Instant::now();

    assert!(limiter.try_acquire("a", now));
    assert!(!limiter.try_acquire("a", now));
    assert!(limiter.try_acquire("b", now));
}

#[test]
fn refill_never_exceeds_capacity() {
    let limiter = RateLimiter::new(2);
    let start = Instant::now();

    // Long idle; capacity stays at 2
    let later = start + Duration::from_secs(3600);
    assert!(limiter.try_acquire("a", later));
    assert!(limiter.try_acquire("a", later));
    assert!(!limiter.try_acquire("a", later));
}
