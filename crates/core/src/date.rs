//! Date normalization for spreadsheet cells.
//!
//! Cells arrive as Excel serial numbers, ISO strings, or whatever a human typed
//! ("3/10/25", "03 October 2025", "Date: 03.10.2025"). Numeric day/month/year
//! forms are read day-first.

use std::sync::OnceLock;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::error::NormalizeError;

/// Largest serial Excel can represent (9999-12-31).
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// Year-first formats. Only tried when the value leads with a 4-digit year,
/// since chrono's `%Y` also accepts one or two digits.
const ISO_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Month-name formats tried against the whole (trimmed) value.
const TEXT_FORMATS: &[&str] = &[
    "%d %B %Y",
    "%d %b %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%A %d %B %Y",
    "%a %d %b %Y",
];

fn numeric_dmy_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|[^\d])(\d{1,2})[\\/.\-](\d{1,2})[\\/.\-](\d{2,4})(?:[^\d]|$)")
            .expect("static regex")
    })
}

fn embedded_iso_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|[^\d])(\d{4})-(\d{2})-(\d{2})(?:[^\d]|$)").expect("static regex")
    })
}

/// Convert an Excel 1900-system serial to a calendar date.
///
/// The 1899-12-30 epoch absorbs Excel's phantom 1900-02-29 for every serial
/// after 60, which covers all dates a diary can plausibly carry.
pub fn from_excel_serial(serial: f64) -> Result<NaiveDate, NormalizeError> {
    if !serial.is_finite() || serial < 1.0 || serial > MAX_EXCEL_SERIAL {
        return Err(NormalizeError::DateSerial(serial.to_string()));
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).ok_or_else(|| NormalizeError::DateSerial(serial.to_string()))?;
    epoch
        .checked_add_signed(Duration::days(serial.floor() as i64))
        .ok_or_else(|| NormalizeError::DateSerial(serial.to_string()))
}

/// Parse a free-text date. Returns `Date` error when nothing matches.
pub fn parse_date_text(value: &str) -> Result<NaiveDate, NormalizeError> {
    let cleaned = value.replace('\u{a0}', " ");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return Err(NormalizeError::Date(String::new()));
    }

    let year_first = cleaned.len() >= 4 && cleaned.as_bytes()[..4].iter().all(u8::is_ascii_digit);
    if year_first {
        for fmt in DATETIME_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(cleaned, fmt) {
                return Ok(dt.date());
            }
        }
        for fmt in ISO_FORMATS {
            if let Ok(d) = NaiveDate::parse_from_str(cleaned, fmt) {
                return Ok(d);
            }
        }
    }
    for fmt in TEXT_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(cleaned, fmt) {
            return Ok(d);
        }
    }

    // Bare serial typed or exported as text (e.g. "45689" from a CSV dump).
    if cleaned.len() == 5 && cleaned.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(n) = cleaned.parse::<f64>() {
            return from_excel_serial(n);
        }
    }

    if let Some(caps) = numeric_dmy_re().captures(cleaned) {
        let day: u32 = caps[1].parse().unwrap_or(0);
        let month: u32 = caps[2].parse().unwrap_or(0);
        let mut year: i32 = caps[3].parse().unwrap_or(0);
        if caps[3].len() == 3 {
            return Err(NormalizeError::Date(cleaned.to_string()));
        }
        if year < 100 {
            year += 2000;
        }
        return NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| NormalizeError::Date(cleaned.to_string()));
    }

    if let Some(caps) = embedded_iso_re().captures(cleaned) {
        let year: i32 = caps[1].parse().unwrap_or(0);
        let month: u32 = caps[2].parse().unwrap_or(0);
        let day: u32 = caps[3].parse().unwrap_or(0);
        if let Some(d) = NaiveDate::from_ymd_opt(year, month, day) {
            return Ok(d);
        }
    }

    Err(NormalizeError::Date(cleaned.to_string()))
}
