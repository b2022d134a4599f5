// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    seconds = { 5, "5s" },
    just_under_minute = { 59, "59s" },
    minutes = { 150, "2m" },
    exact_hour = { 3600, "1h" },
    hour_and_minutes = { 5400, "1h30m" },
    days = { 200_000, "2d" },
)]
fn formats_elapsed(secs: u64, expected: &str) {
    assert_eq!(format_elapsed(secs), expected);
}

#[test]
fn ms_wrapper_truncates() {
    assert_eq!(format_elapsed_ms(61_500), "1m");
}
