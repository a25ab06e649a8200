// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Extract the calendar day from an ISO 8601 timestamp string.
pub fn parse_utc_day(date: &str) -> Option<NaiveDate> {
    let day = date.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uses_z_suffix() {
        let date = DateTime::parse_from_rfc3339("2024-01-15T10:30:00+00:00")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_utc_rfc3339(date), "2024-01-15T10:30:00Z");
    }

    #[test]
    fn test_parse_utc_day() {
        assert_eq!(
            parse_utc_day("2024-01-15T10:30:00Z"),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert_eq!(parse_utc_day("2024-01-15"), NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(parse_utc_day("garbage"), None);
        assert_eq!(parse_utc_day(""), None);
    }
}
