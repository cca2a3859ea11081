//! Field-level parsing for uploaded tables.
//!
//! Each parser returns the reason a value was rejected so the loader can
//! report every defect in a file, not just the first one.

use bli_dataset_models::PINCODE_WIDTH;
use chrono::{Datelike as _, NaiveDate};

/// Day-first layouts accepted for the `date` column, tried in order.
/// `DD-MM-YYYY` is the advertised contract; ISO dates are also accepted.
const DATE_FORMATS: &[&str] = &["%d-%m-%Y", "%d/%m/%Y", "%d.%m.%Y", "%Y-%m-%d"];

/// Plausible reporting years. Two-digit years parse as year 24 AD under
/// `%Y`, so anything outside this window is treated as malformed.
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1900..=2100;

/// Parses a day-first calendar date.
///
/// # Errors
///
/// Returns a description of the problem if the value is empty, matches
/// none of the accepted layouts, or falls outside [`YEAR_RANGE`].
pub fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err("empty date".to_string());
    }

    let date = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .ok_or_else(|| format!("unparsable date '{value}' (expected DD-MM-YYYY)"))?;

    if !YEAR_RANGE.contains(&date.year()) {
        return Err(format!("date '{value}' has an implausible year"));
    }

    Ok(date)
}

/// Largest count a single row may carry (`u32::MAX`). Keeps every sum the
/// engine forms over a file far below `u64::MAX`.
pub const MAX_COUNT: u64 = 4_294_967_295;

/// Parses a non-negative integer count no larger than [`MAX_COUNT`].
///
/// Whole-number decimals such as `"12.0"` (a common spreadsheet export
/// artifact) are accepted; fractional, negative, or non-numeric values
/// are not.
///
/// # Errors
///
/// Returns a description of the problem when the value is not a
/// non-negative whole number or exceeds [`MAX_COUNT`].
pub fn parse_count(raw: &str) -> Result<u64, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err("empty count".to_string());
    }

    let too_large = || format!("count '{value}' exceeds {MAX_COUNT}");

    if let Ok(n) = value.parse::<u64>() {
        return if n > MAX_COUNT { Err(too_large()) } else { Ok(n) };
    }

    match value.parse::<f64>() {
        Ok(f) if f.is_finite() && f < 0.0 => Err(format!("negative count '{value}'")),
        #[allow(clippy::cast_precision_loss)]
        Ok(f) if f.is_finite() && f.fract() == 0.0 && f > MAX_COUNT as f64 => Err(too_large()),
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Ok(f) if f.is_finite() && f.fract() == 0.0 => Ok(f as u64),
        _ => Err(format!("'{value}' is not a whole-number count")),
    }
}

/// Validates a pincode and returns it as fixed-width text.
///
/// Values shorter than [`PINCODE_WIDTH`] are left-padded with zeros, which
/// restores leading zeros dropped by spreadsheet tools.
///
/// # Errors
///
/// Returns a description of the problem when the value is empty, contains
/// anything but ASCII digits, or is longer than [`PINCODE_WIDTH`].
pub fn parse_pincode(raw: &str) -> Result<String, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err("empty pincode".to_string());
    }
    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("pincode '{value}' must contain only digits"));
    }
    if value.len() > PINCODE_WIDTH {
        return Err(format!(
            "pincode '{value}' is longer than {PINCODE_WIDTH} digits"
        ));
    }
    Ok(format!("{value:0>PINCODE_WIDTH$}"))
}

/// Validates a state or district name. Canonicalization happens when the
/// geography key is built.
///
/// # Errors
///
/// Returns a description of the problem when the value is blank.
pub fn parse_name(raw: &str, what: &str) -> Result<String, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(format!("empty {what}"));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_day_first_dates() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert_eq!(parse_date("01-03-2025").unwrap(), expected);
        assert_eq!(parse_date("01/03/2025").unwrap(), expected);
        assert_eq!(parse_date("1.3.2025").unwrap(), expected);
        assert_eq!(parse_date(" 2025-03-01 ").unwrap(), expected);
    }

    #[test]
    fn rejects_impossible_dates() {
        assert!(parse_date("31-02-2025").is_err());
        assert!(parse_date("yesterday").is_err());
        assert!(parse_date("").is_err());
    }

    #[test]
    fn rejects_two_digit_years() {
        let err = parse_date("01-03-25").unwrap_err();
        assert!(err.contains("implausible year"), "{err}");
    }

    #[test]
    fn parses_counts() {
        assert_eq!(parse_count("42").unwrap(), 42);
        assert_eq!(parse_count(" 7 ").unwrap(), 7);
        assert_eq!(parse_count("12.0").unwrap(), 12);
        assert_eq!(parse_count("0").unwrap(), 0);
    }

    #[test]
    fn rejects_bad_counts() {
        assert!(parse_count("-3").unwrap_err().contains("negative"));
        assert!(parse_count("2.5").is_err());
        assert!(parse_count("abc").is_err());
        assert!(parse_count("").is_err());
        assert!(parse_count("NaN").is_err());
    }

    #[test]
    fn rejects_counts_above_the_row_limit() {
        assert_eq!(parse_count("4294967295").unwrap(), MAX_COUNT);
        assert!(parse_count("4294967296").unwrap_err().contains("exceeds"));
        assert!(parse_count("18446744073709551615").unwrap_err().contains("exceeds"));
        assert!(parse_count("5000000000.0").unwrap_err().contains("exceeds"));
        assert!(parse_count("1e30").unwrap_err().contains("exceeds"));
    }

    #[test]
    fn keeps_pincode_leading_zeros() {
        assert_eq!(parse_pincode("011001").unwrap(), "011001");
        assert_eq!(parse_pincode("11001").unwrap(), "011001");
        assert_eq!(parse_pincode(" 411001 ").unwrap(), "411001");
    }

    #[test]
    fn rejects_bad_pincodes() {
        assert!(parse_pincode("41100A").is_err());
        assert!(parse_pincode("4110011").is_err());
        assert!(parse_pincode("411001.0").is_err());
        assert!(parse_pincode("").is_err());
    }

    #[test]
    fn rejects_blank_names() {
        assert!(parse_name("   ", "district").is_err());
        assert_eq!(parse_name(" Pune ", "district").unwrap(), "Pune");
    }
}
