//! Timestamp utilities for FCI.
//!
//! Timestamps are stored and rendered as RFC 3339 text in UTC with a fixed
//! microsecond precision, so their lexicographic order matches time order.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::{FciError, Result};

/// Format a timestamp for storage and API responses.
///
/// Always produces `YYYY-MM-DDTHH:MM:SS.ffffffZ`.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| FciError::Database(format!("invalid timestamp {s:?}: {e}")))
}

/// Current time truncated to the stored precision.
pub fn now() -> DateTime<Utc> {
    truncate(Utc::now())
}

/// New modification time for a record last modified at `previous`.
///
/// Never earlier than `previous`, even if the wall clock stepped back.
pub fn touch(previous: &DateTime<Utc>) -> DateTime<Utc> {
    now().max(*previous)
}

fn truncate(dt: DateTime<Utc>) -> DateTime<Utc> {
    let micros = dt.timestamp_micros();
    DateTime::from_timestamp_micros(micros).unwrap_or(dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_format_timestamp() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(format_timestamp(&dt), "2024-01-15T10:30:00.000000Z");
    }

    #[test]
    fn test_parse_roundtrip_keeps_micros() {
        let dt = now();
        let parsed = parse_timestamp(&format_timestamp(&dt)).unwrap();
        assert_eq!(parsed, dt);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_formatted_order_matches_time_order() {
        let early = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let late = early + Duration::microseconds(1);
        assert!(format_timestamp(&early) < format_timestamp(&late));
    }

    #[test]
    fn test_touch_is_monotonic() {
        let future = Utc::now() + Duration::days(1);
        let future = parse_timestamp(&format_timestamp(&future)).unwrap();
        assert_eq!(touch(&future), future);

        let past = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        assert!(touch(&past) > past);
    }
}
