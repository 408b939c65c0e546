// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting and duration strings.

use chrono::{DateTime, SecondsFormat, Utc};
use std::time::Duration;

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Current Unix time in whole seconds.
pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}

/// Parse a duration string such as `15m`, `7d`, `3600s` or `3600`.
///
/// A bare number is taken as seconds. Zero durations are rejected.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let (digits, unit) = match input.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&input[..idx], c),
        _ => (input, 's'),
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: u64 = digits.parse().ok()?;

    let multiplier = match unit {
        's' => 1,
        'm' => 60,
        'h' => 60 * 60,
        'd' => 24 * 60 * 60,
        _ => return None,
    };

    let secs = value.checked_mul(multiplier)?;
    if secs == 0 {
        return None;
    }
    Some(Duration::from_secs(secs))
}
