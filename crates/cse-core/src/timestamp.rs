//! Timestamp normalization across the encodings used by chat session stores.
//!
//! Sources disagree on how they store time: Unix epoch integers, RFC 3339 with
//! or without fractional seconds, SQL `DATETIME` strings and a few legacy mail
//! formats. Everything is normalized to [`DateTime<Utc>`] on the way in and
//! emitted as RFC 3339 in UTC on the way out.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};

/// Naive layouts tried after RFC 3339, interpreted as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Epoch values at or above this magnitude are treated as milliseconds.
///
/// `10^11` seconds is roughly the year 5138, far past any real session.
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Layout of timestamps handed back to internal records.
const RECORD_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Parses a timestamp in any supported encoding.
///
/// Formats are tried in order: RFC 3339 (with optional fractional seconds),
/// SQL datetime strings, a Unix epoch integer (seconds, or milliseconds for
/// large values), RFC 2822 and finally a bare date. Returns `None` for empty
/// input or when nothing matches; an unparseable timestamp is not an error.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }

    if let Some(dt) = parse_epoch(s) {
        return Some(dt);
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parses an optional timestamp; `None` and empty strings yield `None`.
pub fn parse_optional(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(parse_timestamp)
}

fn parse_epoch(s: &str) -> Option<DateTime<Utc>> {
    let digits = s.strip_prefix('-').unwrap_or(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: i64 = s.parse().ok()?;
    if value.unsigned_abs() >= EPOCH_MILLIS_THRESHOLD.unsigned_abs() {
        Utc.timestamp_millis_opt(value).single()
    } else {
        Utc.timestamp_opt(value, 0).single()
    }
}

/// Formats an instant as RFC 3339 in UTC (`Z` suffix, fractional seconds only
/// when present).
pub fn format_rfc3339(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Formats an instant for internal records: RFC 3339 truncated to whole
/// seconds, always UTC.
pub fn format_record_time(dt: &DateTime<Utc>) -> String {
    dt.format(RECORD_FORMAT).to_string()
}

/// Serde adapter for optional RFC 3339 timestamps.
///
/// Serializes through [`format_rfc3339`]. Deserialization is lenient: any
/// encoding accepted by [`parse_timestamp`] is read, and unparseable strings
/// become `None` instead of failing the whole document.
pub mod rfc3339_opt {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    #[expect(
        clippy::ref_option,
        reason = "serde's serialize_with passes &Option<T>"
    )]
    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_str(&super::format_rfc3339(dt)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(super::parse_timestamp))
    }
}
