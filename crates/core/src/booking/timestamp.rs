//! Lenient timestamp parsing for booking-source values.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parses a raw booking-source timestamp.
///
/// Accepted forms, tried in order: RFC 3339, `YYYY-MM-DD HH:MM:SS`,
/// `YYYY-MM-DDTHH:MM:SS` (both naive, read as UTC), `YYYY-MM-DD` (midnight
/// UTC) and integer epoch milliseconds. Returns `None` for anything else.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    if raw.bytes().all(|b| b.is_ascii_digit()) {
        return raw
            .parse::<i64>()
            .ok()
            .and_then(DateTime::from_timestamp_millis);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    #[rstest]
    #[case("2025-12-20T10:00:00Z", Utc.with_ymd_and_hms(2025, 12, 20, 10, 0, 0).unwrap())]
    #[case("2026-01-31T23:30:00-02:00", Utc.with_ymd_and_hms(2026, 2, 1, 1, 30, 0).unwrap())]
    #[case("2026-01-15 08:45:00", Utc.with_ymd_and_hms(2026, 1, 15, 8, 45, 0).unwrap())]
    #[case("2026-01-15T08:45:00", Utc.with_ymd_and_hms(2026, 1, 15, 8, 45, 0).unwrap())]
    #[case("2026-02-03", Utc.with_ymd_and_hms(2026, 2, 3, 0, 0, 0).unwrap())]
    #[case("1767225600000", Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap())]
    #[case("  2026-02-03  ", Utc.with_ymd_and_hms(2026, 2, 3, 0, 0, 0).unwrap())]
    fn test_parse_accepted_forms(#[case] raw: &str, #[case] expected: DateTime<Utc>) {
        assert_eq!(parse_timestamp(raw), Some(expected));
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("tomorrow")]
    #[case("15/01/2026")]
    #[case("2026-13-01")]
    #[case("-1000")]
    fn test_parse_rejects_garbage(#[case] raw: &str) {
        assert_eq!(parse_timestamp(raw), None);
    }
}
