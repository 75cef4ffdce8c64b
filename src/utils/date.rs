// src/utils/date.rs

//! Lenient publish-date parsing for feed and index timestamps.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%B %d, %Y", "%b %d, %Y", "%d %B %Y", "%d %b %Y"];

/// Parse a publish timestamp as feeds and listing pages tend to write it.
///
/// Tries RFC 3339, then RFC 2822, then a few naive date/time layouts which
/// are read as UTC. Returns `None` for blank or unrecognized input.
pub fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_rfc3339_and_rfc2822() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(parse_published("2025-03-01T12:00:00Z"), Some(expected));
        assert_eq!(parse_published("2025-03-01T14:00:00+02:00"), Some(expected));
        assert_eq!(parse_published("Sat, 01 Mar 2025 12:00:00 +0000"), Some(expected));
    }

    #[test]
    fn test_naive_layouts() {
        let midnight = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_published("2025-03-01"), Some(midnight));
        assert_eq!(parse_published("2025/03/01"), Some(midnight));
        assert_eq!(parse_published("March 01, 2025"), Some(midnight));
        assert_eq!(parse_published("Mar 1, 2025"), Some(midnight));
        assert_eq!(
            parse_published("2025-03-01 08:30:00"),
            Some(Utc.with_ymd_and_hms(2025, 3, 1, 8, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_garbage_is_none() {
        assert_eq!(parse_published(""), None);
        assert_eq!(parse_published("yesterday-ish"), None);
        assert_eq!(parse_published("2025-13-45"), None);
    }
}
