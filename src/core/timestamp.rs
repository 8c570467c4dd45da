//! Timestamp normalization for CAD exports.
//!
//! Every vendor writes times differently. This module turns the common shapes
//! into a `YYYY-MM-DD` date and an `HH:MM:SS` time. Slash-separated dates are
//! always read as US-style `MM/DD/YYYY`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

/// A timestamp split into the canonical date and time strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedTimestamp {
    pub date: String,
    pub time: String,
    pub timestamp: NaiveDateTime,
}

impl NormalizedTimestamp {
    pub fn from_naive(timestamp: NaiveDateTime) -> Self {
        Self {
            date: timestamp.format("%Y-%m-%d").to_string(),
            time: timestamp.format("%H:%M:%S").to_string(),
            timestamp,
        }
    }
}

const ISO_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

const SPACE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

const SLASH_TIME_SUFFIXES: &[&str] = &[
    " %H:%M:%S",
    " %H:%M",
    " %I:%M:%S %p",
    " %I:%M %p",
    " %I:%M:%S%p",
    " %I:%M%p",
];

const TIME_OF_DAY_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M:%S", "%H:%M", "%I:%M:%S %p", "%I:%M %p"];

/// Parses `raw` with the strategies below, in order, returning `None` when
/// none of them produces a valid date:
///
/// 1. ISO-8601 with a literal `T` (an explicit offset keeps its wall-clock time)
/// 2. `YYYY-MM-DD[ HH:MM[:SS]]`
/// 3. `MM/DD/YYYY[ time]` (two-digit years allowed) or `YYYY/MM/DD[ time]`
/// 4. digit-only strings longer than 9 characters as Unix epoch milliseconds
#[must_use]
pub fn normalize_timestamp(raw: &str) -> Option<NormalizedTimestamp> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    parse_iso(value)
        .or_else(|| parse_space_separated(value))
        .or_else(|| parse_slash_separated(value))
        .or_else(|| parse_epoch_millis(value))
        .map(NormalizedTimestamp::from_naive)
}

/// Like [`normalize_timestamp`] but for JSON values. Numbers are treated as
/// epoch milliseconds.
#[must_use]
pub fn normalize_value(value: &serde_json::Value) -> Option<NormalizedTimestamp> {
    match value {
        serde_json::Value::String(s) => normalize_timestamp(s),
        serde_json::Value::Number(n) => {
            #[allow(clippy::cast_possible_truncation)]
            let ms = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            if ms.unsigned_abs().to_string().len() <= 9 {
                return None;
            }
            DateTime::from_timestamp_millis(ms)
                .map(|dt| NormalizedTimestamp::from_naive(dt.naive_utc()))
        }
        _ => None,
    }
}

/// Parses a bare time of day (`14:30`, `14:30:00`, `2:30 PM`, `1430`).
#[must_use]
pub fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    let value = raw.trim();
    if value.len() == 4 && value.bytes().all(|b| b.is_ascii_digit()) {
        let hour = value[..2].parse::<u32>().ok()?;
        let min = value[2..].parse::<u32>().ok()?;
        return NaiveTime::from_hms_opt(hour, min, 0);
    }
    TIME_OF_DAY_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(value, fmt).ok())
}

fn parse_iso(value: &str) -> Option<NaiveDateTime> {
    if !value.contains('T') {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    if let Some(stripped) = value.strip_suffix('Z') {
        return first_datetime_match(stripped, ISO_FORMATS);
    }
    first_datetime_match(value, ISO_FORMATS)
}

fn parse_space_separated(value: &str) -> Option<NaiveDateTime> {
    if let Some(dt) = first_datetime_match(value, SPACE_FORMATS) {
        return Some(dt);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn parse_slash_separated(value: &str) -> Option<NaiveDateTime> {
    if !value.contains('/') {
        return None;
    }

    let date_part = value.split_whitespace().next()?;
    let parts: Vec<&str> = date_part.split('/').collect();
    if parts.len() != 3 {
        return None;
    }

    // %Y 會把 "24" 讀成西元 24 年，所以依年份長度挑格式
    let date_format = if parts[0].len() == 4 {
        "%Y/%m/%d"
    } else if parts[2].len() == 2 {
        "%m/%d/%y"
    } else {
        "%m/%d/%Y"
    };

    if date_part.len() == value.len() {
        return NaiveDate::parse_from_str(value, date_format)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0));
    }

    SLASH_TIME_SUFFIXES.iter().find_map(|suffix| {
        let fmt = format!("{}{}", date_format, suffix);
        NaiveDateTime::parse_from_str(value, &fmt).ok()
    })
}

fn parse_epoch_millis(value: &str) -> Option<NaiveDateTime> {
    if value.len() <= 9 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let ms = value.parse::<i64>().ok()?;
    DateTime::from_timestamp_millis(ms).map(|dt| dt.naive_utc())
}

fn first_datetime_match(value: &str, formats: &[&str]) -> Option<NaiveDateTime> {
    formats
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}
