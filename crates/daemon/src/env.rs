// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recognised environment variables and their defaults.

use std::str::FromStr;

/// `MAX_PROCESS_RUNTIME_SEC`: per-project wall-clock deadline.
pub fn max_process_runtime_secs() -> u64 {
    parse("MAX_PROCESS_RUNTIME_SEC", 1800)
}

/// `HEARTBEAT_TIMEOUT_SEC`: heartbeat freshness requirement.
pub fn heartbeat_timeout_secs() -> i64 {
    parse("HEARTBEAT_TIMEOUT_SEC", 600)
}

/// `MAX_TIMEOUT_EXTENSIONS`: extensions before timeout-to-failed.
pub fn max_timeout_extensions() -> u32 {
    parse("MAX_TIMEOUT_EXTENSIONS", 3)
}

/// `PHANTOM_GRACE_PERIOD_SEC`: sweep exemption for young projects.
pub fn phantom_grace_secs() -> i64 {
    parse("PHANTOM_GRACE_PERIOD_SEC", 900)
}

/// `STATE_SYNC_INTERVAL_SEC`: reconcile/sweep period.
pub fn state_sync_interval_secs() -> u64 {
    parse("STATE_SYNC_INTERVAL_SEC", 300)
}

/// `EMERGENCY_BYPASS`: truthy suppresses compliance blocking.
pub fn emergency_bypass() -> bool {
    truthy("EMERGENCY_BYPASS")
}

/// `DISABLE_FAST_LANE`: truthy disables the auto-coordination add-on.
pub fn fast_lane_disabled() -> bool {
    truthy("DISABLE_FAST_LANE")
}

fn parse<T: FromStr + Copy>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn truthy(key: &str) -> bool {
    std::env::var(key)
        .map(|v| {
            matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
