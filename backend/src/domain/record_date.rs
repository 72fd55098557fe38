//! Parsing of record dates.
//!
//! Stored records carry their date as text in one of two encodings:
//!
//! - ISO `YYYY-MM-DD`, optionally followed by a time (`2025-03-05T10:00:00Z`)
//! - `DD/MM/YYYY`, written by older entry forms
//!
//! The presence of `/` selects the day/month/year reading. For ISO date-times
//! the calendar date is taken as written; no time-zone conversion is applied,
//! so a record entered late on the last day of a month stays in that month.
//!
//! New writes are normalised to ISO by [`normalize_to_iso`], so only legacy
//! data ever reaches the slash branch.

use chrono::NaiveDate;

/// Textual encoding detected for a record date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateEncoding {
    Iso,
    DayMonthYear,
}

/// Decide how a raw date string should be read
pub fn detect_encoding(raw: &str) -> DateEncoding {
    if raw.contains('/') {
        DateEncoding::DayMonthYear
    } else {
        DateEncoding::Iso
    }
}

/// Parse a record date, returning `None` for empty or malformed input
pub fn parse_record_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match detect_encoding(trimmed) {
        DateEncoding::DayMonthYear => parse_day_month_year(trimmed),
        DateEncoding::Iso => parse_iso(trimmed),
    }
}

/// Rewrite any accepted date encoding as `YYYY-MM-DD`
pub fn normalize_to_iso(raw: &str) -> Option<String> {
    parse_record_date(raw).map(|date| date.format("%Y-%m-%d").to_string())
}

fn parse_day_month_year(raw: &str) -> Option<NaiveDate> {
    // "05/03/2025 10:30" keeps only the date token
    let date_token = raw.split_whitespace().next()?;
    let mut parts = date_token.split('/');
    let day = parts.next()?.trim().parse::<u32>().ok()?;
    let month = parts.next()?.trim().parse::<u32>().ok()?;
    let year = parts.next()?.trim().parse::<i32>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_iso(raw: &str) -> Option<NaiveDate> {
    // Date-times are cut at the first 'T' or space; the date part is kept verbatim
    let date_part = raw
        .split(|c| c == 'T' || c == ' ')
        .next()
        .unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_slash_dates_are_day_first() {
        assert_eq!(parse_record_date("05/03/2025"), Some(ymd(2025, 3, 5)));
        assert_eq!(parse_record_date("31/12/2024"), Some(ymd(2024, 12, 31)));
        assert_eq!(parse_record_date("5/3/2025"), Some(ymd(2025, 3, 5)));
    }

    #[test]
    fn test_slash_date_with_time_suffix() {
        assert_eq!(parse_record_date("05/03/2025 18:45"), Some(ymd(2025, 3, 5)));
    }

    #[test]
    fn test_iso_dates_and_date_times() {
        assert_eq!(parse_record_date("2025-03-05"), Some(ymd(2025, 3, 5)));
        assert_eq!(parse_record_date("2025-03-31T23:30:00.000Z"), Some(ymd(2025, 3, 31)));
        assert_eq!(parse_record_date("2025-03-31 23:30:00"), Some(ymd(2025, 3, 31)));
        assert_eq!(parse_record_date("  2025-04-01  "), Some(ymd(2025, 4, 1)));
    }

    #[test]
    fn test_malformed_dates_are_rejected() {
        assert_eq!(parse_record_date(""), None);
        assert_eq!(parse_record_date("   "), None);
        assert_eq!(parse_record_date("yesterday"), None);
        assert_eq!(parse_record_date("31/02/2025"), None);
        assert_eq!(parse_record_date("03/2025"), None);
        assert_eq!(parse_record_date("01/02/03/2025"), None);
        assert_eq!(parse_record_date("2025-13-01"), None);
    }

    #[test]
    fn test_detect_encoding() {
        assert_eq!(detect_encoding("05/03/2025"), DateEncoding::DayMonthYear);
        assert_eq!(detect_encoding("2025-03-05"), DateEncoding::Iso);
    }

    #[test]
    fn test_normalize_to_iso() {
        assert_eq!(normalize_to_iso("05/03/2025").as_deref(), Some("2025-03-05"));
        assert_eq!(normalize_to_iso("2025-03-05T08:00:00Z").as_deref(), Some("2025-03-05"));
        assert_eq!(normalize_to_iso("garbage"), None);
    }
}
