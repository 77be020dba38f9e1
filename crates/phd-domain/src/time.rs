use chrono::{DateTime, NaiveDate, Utc};

use crate::error::DomainError;

/// Acepta RFC 3339 (`2026-10-01T08:00:00Z`) o una fecha simple
/// (`2026-10-01`, medianoche UTC).
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DomainError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
                                              .and_then(|d| d.and_hms_opt(0, 0, 0))
                                              .map(|d| d.and_utc())
                                              .ok_or_else(|| DomainError::InvalidTimestamp(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn rfc3339_is_normalized_to_utc() {
        let ts = parse_timestamp("2026-10-01T10:00:00+02:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2026, 10, 1, 8, 0, 0).unwrap());
    }

    #[test]
    fn bare_date_is_midnight() {
        assert_eq!(parse_timestamp(" 2026-02-28 ").unwrap(),
                   Utc.with_ymd_and_hms(2026, 2, 28, 0, 0, 0).unwrap());
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(parse_timestamp("yesterday"), Err(DomainError::InvalidTimestamp("yesterday".into())));
    }
}
