//! Timestamp shapes accepted from report stores and their normalization.
//!
//! Upstream records carry timestamps as ISO 8601 strings, epoch
//! milliseconds (the serialized form of a native date), or a
//! `{seconds, nanoseconds}` wrapper as written by document stores (or
//! `{_seconds, _nanoseconds}` in exports). All of them are collapsed into
//! a single [`DateTime<Utc>`] when a [`crate::RawReport`] is converted
//! into a [`crate::Report`].
//!
//! A timestamp in any other shape never rejects its report; it reads as
//! absent (see [`deserialize_lenient`]).

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A timestamp exactly as it arrived from the report store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    /// ISO 8601 / RFC 3339 text (with or without offset).
    Text(String),
    /// Milliseconds since the Unix epoch.
    EpochMillis(i64),
    /// Seconds since the Unix epoch with an optional sub-second part.
    Seconds {
        /// Whole seconds since the Unix epoch.
        #[serde(alias = "_seconds")]
        seconds: i64,
        /// Sub-second nanoseconds.
        #[serde(default, alias = "nanos", alias = "_nanoseconds")]
        nanoseconds: u32,
    },
}

impl RawTimestamp {
    /// Normalizes this timestamp to a UTC instant.
    ///
    /// Returns `None` when the value cannot be interpreted; such reports
    /// are excluded from aggregation rather than treated as errors.
    #[must_use]
    pub fn normalize(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Text(s) => parse_iso_timestamp(s),
            Self::EpochMillis(ms) => DateTime::from_timestamp_millis(*ms),
            Self::Seconds {
                seconds,
                nanoseconds,
            } => DateTime::from_timestamp(*seconds, *nanoseconds),
        }
    }
}

impl From<DateTime<Utc>> for RawTimestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Text(value.to_rfc3339())
    }
}

/// Deserializes an optional [`RawTimestamp`] without ever failing.
///
/// Fractional epoch milliseconds are rounded to whole milliseconds. Any
/// other value that is not a known shape (including `null`) yields `None`.
///
/// # Errors
///
/// Only propagates errors from the underlying deserializer itself, such as
/// truncated input.
pub fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Option<RawTimestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lenient {
        Known(RawTimestamp),
        FractionalMillis(f64),
        Unrecognized(serde::de::IgnoredAny),
    }

    Ok(match Lenient::deserialize(deserializer)? {
        Lenient::Known(raw) => Some(raw),
        Lenient::FractionalMillis(ms) => fractional_millis(ms),
        Lenient::Unrecognized(_) => None,
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn fractional_millis(ms: f64) -> Option<RawTimestamp> {
    let ms = ms.round();
    (ms.is_finite() && ms >= i64::MIN as f64 && ms < i64::MAX as f64)
        .then(|| RawTimestamp::EpochMillis(ms as i64))
}

/// Parses an ISO 8601 timestamp string.
///
/// Accepts full RFC 3339 (`2024-07-09T10:00:00Z`, `+05:30` offsets),
/// offset-less date-times (interpreted as UTC, with optional fractional
/// seconds), space-separated date-times, and bare dates (midnight UTC).
#[must_use]
pub fn parse_iso_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339_with_zulu() {
        let dt = parse_iso_timestamp("2024-07-09T10:00:00Z").unwrap();
        assert_eq!(dt.to_string(), "2024-07-09 10:00:00 UTC");
    }

    #[test]
    fn parses_rfc3339_with_offset() {
        let dt = parse_iso_timestamp("2024-07-09T15:30:00+05:30").unwrap();
        assert_eq!(dt.to_string(), "2024-07-09 10:00:00 UTC");
    }

    #[test]
    fn parses_naive_with_fractional_seconds() {
        let dt = parse_iso_timestamp("2024-01-15T14:30:00.000").unwrap();
        assert_eq!(dt.to_string(), "2024-01-15 14:30:00 UTC");
    }

    #[test]
    fn parses_bare_date_as_midnight() {
        let dt = parse_iso_timestamp("2024-01-15").unwrap();
        assert_eq!(dt.to_string(), "2024-01-15 00:00:00 UTC");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_iso_timestamp("yesterday-ish").is_none());
        assert!(parse_iso_timestamp("   ").is_none());
    }

    #[test]
    fn normalizes_epoch_millis() {
        let dt = RawTimestamp::EpochMillis(1_720_519_200_000).normalize().unwrap();
        assert_eq!(dt.to_string(), "2024-07-09 10:00:00 UTC");
    }

    #[test]
    fn normalizes_seconds_wrapper() {
        let raw = RawTimestamp::Seconds {
            seconds: 1_720_519_200,
            nanoseconds: 500_000_000,
        };
        let dt = raw.normalize().unwrap();
        assert_eq!(dt.timestamp_millis(), 1_720_519_200_500);
    }

    #[test]
    fn deserializes_every_shape() {
        let text: RawTimestamp = serde_json::from_str(r#""2024-07-09T10:00:00Z""#).unwrap();
        let millis: RawTimestamp = serde_json::from_str("1720519200000").unwrap();
        let wrapper: RawTimestamp =
            serde_json::from_str(r#"{"seconds": 1720519200, "nanoseconds": 0}"#).unwrap();
        let short: RawTimestamp = serde_json::from_str(r#"{"seconds": 1720519200}"#).unwrap();

        let expected = parse_iso_timestamp("2024-07-09T10:00:00Z");
        assert_eq!(text.normalize(), expected);
        assert_eq!(millis.normalize(), expected);
        assert_eq!(wrapper.normalize(), expected);
        assert_eq!(short.normalize(), expected);
    }

    #[derive(Deserialize)]
    struct Holder {
        #[serde(default, deserialize_with = "deserialize_lenient")]
        ts: Option<RawTimestamp>,
    }

    fn lenient(json: &str) -> Option<DateTime<Utc>> {
        let holder: Holder = serde_json::from_str(json).unwrap();
        holder.ts.and_then(|ts| ts.normalize())
    }

    #[test]
    fn lenient_accepts_fractional_millis_and_export_wrapper() {
        let expected = parse_iso_timestamp("2024-07-09T10:00:00Z");
        assert_eq!(lenient(r#"{"ts": 1720519200000.0}"#), expected);
        assert_eq!(lenient(r#"{"ts": {"_seconds": 1720519200, "_nanoseconds": 0}}"#), expected);
    }

    #[test]
    fn lenient_reads_unknown_shapes_as_absent() {
        assert_eq!(lenient(r#"{"ts": {"when": "noon"}}"#), None);
        assert_eq!(lenient(r#"{"ts": ["noon"]}"#), None);
        assert_eq!(lenient(r#"{"ts": true}"#), None);
        assert_eq!(lenient(r#"{"ts": null}"#), None);
        assert_eq!(lenient(r#"{"ts": 1e300}"#), None);
        assert_eq!(lenient("{}"), None);
    }
}
