//! Record date handling.
//!
//! The backend returns `createdAt` either as ISO-8601 (`2024-03-05T10:30:00`, with or
//! without an offset) or as `DD/MM/YYYY`. The format is detected first and only then
//! parsed; nothing here splits a string before knowing which shape it has.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::Serialize;

/// The two shapes a record date can arrive in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DateFormat {
    Iso8601,
    DayMonthYear,
}

/// A parsed record date, tagged with the format it was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecordDate {
    pub format: DateFormat,
    pub date: NaiveDate,
}

const ARABIC_MONTHS: [&str; 12] = [
    "يناير", "فبراير", "مارس", "أبريل", "مايو", "يونيو", "يوليو", "أغسطس", "سبتمبر",
    "أكتوبر", "نوفمبر", "ديسمبر",
];

/// Detects the format of `raw` without parsing its values.
pub fn detect_format(raw: &str) -> Option<DateFormat> {
    let raw = raw.trim();
    let bytes = raw.as_bytes();

    // YYYY-MM-DD prefix, optionally followed by a time part.
    let iso_prefix = bytes.len() >= 10
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[4] == b'-'
        && bytes[5..7].iter().all(u8::is_ascii_digit)
        && bytes[7] == b'-'
        && bytes[8..10].iter().all(u8::is_ascii_digit);
    if iso_prefix && (bytes.len() == 10 || bytes[10] == b'T' || bytes[10] == b' ') {
        return Some(DateFormat::Iso8601);
    }

    let parts: Vec<&str> = raw.split('/').collect();
    let dmy = parts.len() == 3
        && (1..=2).contains(&parts[0].len())
        && (1..=2).contains(&parts[1].len())
        && parts[2].len() == 4
        && parts.iter().all(|p| p.bytes().all(|b| b.is_ascii_digit()));
    if dmy {
        return Some(DateFormat::DayMonthYear);
    }

    None
}

/// Parses a record date after detecting its format. Returns `None` for empty,
/// unrecognised or impossible dates (e.g. `31/02/2024`).
pub fn parse_record_date(raw: &str) -> Option<RecordDate> {
    let raw = raw.trim();
    let format = detect_format(raw)?;
    let date = match format {
        DateFormat::Iso8601 => parse_iso(raw)?,
        DateFormat::DayMonthYear => NaiveDate::parse_from_str(raw, "%d/%m/%Y").ok()?,
    };
    Some(RecordDate { format, date })
}

fn parse_iso(raw: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    // ASP.NET serialises DateTime without an offset, often with fractional seconds.
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, pattern) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Formats a date the way the site displays it: `05 مارس 2024`.
pub fn format_display(date: NaiveDate) -> String {
    let month = ARABIC_MONTHS[date.month0() as usize];
    format!("{:02} {} {}", date.day(), month, date.year())
}

/// Convenience for views: the display string, or the raw input when it cannot be parsed.
pub fn display_or_raw(raw: &str) -> String {
    parse_record_date(raw)
        .map(|d| format_display(d.date))
        .unwrap_or_else(|| raw.to_string())
}
