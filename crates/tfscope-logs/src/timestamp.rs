//! Timestamp recovery from free-form log text

use chrono::{DateTime, Local, NaiveDateTime, NaiveTime, TimeZone, Utc};
use std::ops::Range;

use crate::patterns::{PatternError, PatternSet};

/// Recognized timestamp shapes, tried in order. Group 1 is the timestamp text,
/// group 0 the span removed from the message.
static TIMESTAMP_PATTERNS: PatternSet = PatternSet::new(&[
    (
        "datetime",
        r"(?:^|\s)(\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(?:\.\d{1,9})?(?:Z|[+-]\d{2}:\d{2})?)",
    ),
    (
        "bracketed",
        r"\[(\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(?:\.\d{1,9})?(?:Z|[+-]\d{2}:\d{2})?)\]",
    ),
    ("time_of_day", r"\b(\d{2}:\d{2}:\d{2}(?:\.\d{1,9})?)\b"),
]);

const LOCAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A timestamp found in a line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimestampMatch {
    pub instant: DateTime<Utc>,
    /// Byte range of the matched text within the searched line
    pub span: Range<usize>,
}

/// Find the first recognized timestamp in `text`.
///
/// The first pattern that matches decides; if its text cannot be parsed the
/// line has no timestamp. `reference` supplies the date for bare times of day.
pub fn extract_timestamp(
    text: &str,
    reference: Option<DateTime<Utc>>,
) -> Result<Option<TimestampMatch>, PatternError> {
    for (_, regex) in TIMESTAMP_PATTERNS.iter()? {
        let Some(caps) = regex.captures(text) else {
            continue;
        };
        let (Some(whole), Some(stamp)) = (caps.get(0), caps.get(1)) else {
            continue;
        };

        return Ok(parse_with_reference(stamp.as_str(), reference).map(|instant| {
            TimestampMatch {
                instant,
                span: whole.range(),
            }
        }));
    }

    Ok(None)
}

/// Parse a date-time string: ISO-like first, then local wall-clock time
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    parse_iso(raw).or_else(|| parse_local(raw))
}

fn parse_with_reference(raw: &str, reference: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    parse_instant(raw).or_else(|| parse_time_of_day(raw, reference))
}

fn parse_iso(raw: &str) -> Option<DateTime<Utc>> {
    let mut normalized = raw.trim().replacen(' ', "T", 1);
    if !has_offset(&normalized) {
        normalized.push('Z');
    }
    DateTime::parse_from_rfc3339(&normalized)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Only reached for text the ISO parse rejects; a plain
/// `yyyy-MM-dd HH:mm:ss` is accepted there first.
fn parse_local(raw: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(raw.trim(), LOCAL_FORMAT).ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_time_of_day(raw: &str, reference: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    let time = NaiveTime::parse_from_str(raw.trim(), "%H:%M:%S%.f").ok()?;
    let date = reference.unwrap_or_else(Utc::now).date_naive();
    Some(date.and_time(time).and_utc())
}

fn has_offset(s: &str) -> bool {
    if s.ends_with('Z') || s.ends_with('z') {
        return true;
    }
    // "+hh:mm" / "-hh:mm" after the time part
    let bytes = s.as_bytes();
    bytes.len() > 6
        && matches!(bytes[bytes.len() - 6], b'+' | b'-')
        && bytes[bytes.len() - 3] == b':'
        && s.contains('T')
}
