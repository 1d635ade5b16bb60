//! Timestamp parsing that also accepts naive local date-times.
//!
//! Records written by older front ends carry `2025-07-01T10:00:00` with no
//! offset. Those are read as wall-clock time in a given zone; plain serde
//! deserialization uses UTC, the store re-reads them in its reference zone.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse RFC 3339, or a naive date-time taken as local time in `zone`.
pub fn parse_in_zone(value: &str, zone: &FixedOffset) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())?;
    zone.from_local_datetime(&naive)
        .single()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Whether `value` carries its own UTC offset.
pub fn has_offset(value: &str) -> bool {
    DateTime::parse_from_rfc3339(value.trim()).is_ok()
}

/// `deserialize_with` for required timestamps.
pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_in_zone(&raw, &Utc.fix())
        .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw:?}")))
}

/// `deserialize_with` for optional timestamps. Blank strings read as absent.
pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_in_zone(&raw, &Utc.fix())
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_rfc3339_ignores_zone() {
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(parse_in_zone("2025-07-01T10:00:00Z", &plus_two), Some(utc(10, 0)));
        assert_eq!(parse_in_zone("2025-07-01T12:00:00+02:00", &Utc.fix()), Some(utc(10, 0)));
    }

    #[test]
    fn test_naive_is_local_time() {
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(parse_in_zone("2025-07-01T10:00:00", &plus_two), Some(utc(8, 0)));
        assert_eq!(parse_in_zone("2025-07-01T10:30", &Utc.fix()), Some(utc(10, 30)));
        assert_eq!(parse_in_zone("2025-07-01 10:00:00.250", &Utc.fix()).map(|t| t.timestamp()), Some(utc(10, 0).timestamp()));
        assert!(parse_in_zone("next tuesday", &Utc.fix()).is_none());
    }

    #[test]
    fn test_has_offset() {
        assert!(has_offset("2025-07-01T10:00:00Z"));
        assert!(!has_offset("2025-07-01T10:00:00"));
    }
}
