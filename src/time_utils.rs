// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time handling.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Current time as Unix seconds.
pub fn now_unix() -> i64 {
    Utc::now().timestamp()
}

/// Calendar date ("YYYY-MM-DD") of a Strava timestamp such as `2024-01-15T06:52:54Z`.
///
/// Strava's `start_date_local` carries a `Z` suffix even though it is local
/// time, so the date is read as written rather than converted.
pub fn calendar_date(timestamp: &str) -> Option<String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(dt.date_naive().to_string());
    }
    timestamp
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        .map(|d| d.to_string())
}
