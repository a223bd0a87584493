use crate::error::{AggregatorError, Result};
use chrono::{Datelike, NaiveDate};
use serde_json::Value;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub fn first_day_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
        AggregatorError::DateError(format!("Invalid year/month: {}-{:02}", year, month))
    })
}

pub fn last_day_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    let (next_year, next_month) = add_months(year, month, 1);

    first_day_of_month(next_year, next_month)?
        .pred_opt()
        .ok_or_else(|| {
            AggregatorError::DateError(format!("No last day for {}-{:02}", year, month))
        })
}

/// Shifts a (year, month) pair by `delta` months, in either direction.
pub fn add_months(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let zero_based = year * 12 + (month as i32 - 1) + delta;
    (zero_based.div_euclid(12), zero_based.rem_euclid(12) as u32 + 1)
}

pub fn month_name(month: u32) -> &'static str {
    MONTH_NAMES[((month.clamp(1, 12)) - 1) as usize]
}

/// "June 2025"
pub fn month_label(year: i32, month: u32) -> String {
    format!("{} {}", month_name(month), year)
}

/// 1-based quarter of a calendar month.
pub fn quarter_of(month: u32) -> u32 {
    (month.clamp(1, 12) - 1) / 3 + 1
}

pub fn quarter_start_month(quarter: u32) -> u32 {
    (quarter.clamp(1, 4) - 1) * 3 + 1
}

/// Parses "YYYY-MM" (or a full "YYYY-MM-DD") into the first day of that month.
pub fn parse_year_month(value: &str) -> Result<NaiveDate> {
    let trimmed = value.trim();
    let candidate = if trimmed.len() == 7 {
        format!("{}-01", trimmed)
    } else {
        trimmed.to_string()
    };

    let date = NaiveDate::parse_from_str(&candidate, "%Y-%m-%d")
        .map_err(|_| AggregatorError::InvalidReferenceMonth(value.to_string()))?;
    first_day_of_month(date.year(), date.month())
}

/// Lenient parse of a ledger date. Accepts ISO dates, ISO timestamps and US "MM/DD/YYYY".
pub fn parse_ledger_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    let iso_prefix = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(iso_prefix, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%m/%d/%Y"))
        .ok()
}

/// Lenient parse of an amount cell: JSON numbers, or strings such as "1,250.00",
/// "$300" and "(45.10)" for negatives.
pub fn parse_amount(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_amount_str(s),
        _ => None,
    }
}

fn parse_amount_str(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (negative, inner) = match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };

    let cleaned: String = inner.chars().filter(|c| !matches!(c, '$' | ',' | ' ')).collect();
    let parsed = cleaned.parse::<f64>().ok().filter(|v| v.is_finite())?;

    Some(if negative { -parsed } else { parsed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_last_day_of_month() {
        assert_eq!(
            last_day_of_month(2023, 2).unwrap(),
            NaiveDate::from_ymd_opt(2023, 2, 28).unwrap()
        );
        assert_eq!(
            last_day_of_month(2024, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert_eq!(
            last_day_of_month(2023, 12).unwrap(),
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()
        );
    }

    #[test]
    fn test_add_months() {
        assert_eq!(add_months(2025, 6, -11), (2024, 7));
        assert_eq!(add_months(2025, 1, -1), (2024, 12));
        assert_eq!(add_months(2025, 12, 1), (2026, 1));
        assert_eq!(add_months(2025, 3, 0), (2025, 3));
    }

    #[test]
    fn test_quarters() {
        assert_eq!(quarter_of(1), 1);
        assert_eq!(quarter_of(6), 2);
        assert_eq!(quarter_of(12), 4);
        assert_eq!(quarter_start_month(3), 7);
    }

    #[test]
    fn test_parse_year_month() {
        assert_eq!(
            parse_year_month("2025-06").unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
        );
        assert_eq!(
            parse_year_month("2025-06-17").unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
        );
        assert!(parse_year_month("June 2025").is_err());
    }

    #[test]
    fn test_parse_ledger_date() {
        let june5 = NaiveDate::from_ymd_opt(2025, 6, 5).unwrap();
        assert_eq!(parse_ledger_date("2025-06-05"), Some(june5));
        assert_eq!(parse_ledger_date("2025-06-05T00:00:00+00:00"), Some(june5));
        assert_eq!(parse_ledger_date("06/05/2025"), Some(june5));
        assert_eq!(parse_ledger_date("not a date"), None);
        assert_eq!(parse_ledger_date(""), None);
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount(&json!(4500)), Some(4500.0));
        assert_eq!(parse_amount(&json!("1,250.50")), Some(1250.5));
        assert_eq!(parse_amount(&json!("$300")), Some(300.0));
        assert_eq!(parse_amount(&json!("(45.10)")), Some(-45.1));
        assert_eq!(parse_amount(&json!("abc")), None);
        assert_eq!(parse_amount(&json!(null)), None);
    }
}
