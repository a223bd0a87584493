//! Period range generation.
//!
//! Turns a reference month plus a period kind and breakdown into the ordered,
//! non-overlapping, inclusive date ranges that become the columns of a report.

use crate::error::{AggregatorError, Result};
use crate::schema::{Breakdown, PeriodKind, PeriodRange, WeekStart};
use crate::utils::{
    add_months, first_day_of_month, last_day_of_month, month_label, quarter_of,
    quarter_start_month,
};
use chrono::{Datelike, Days, NaiveDate};
use log::debug;

pub fn generate_ranges(
    reference_month: NaiveDate,
    kind: PeriodKind,
    breakdown: Breakdown,
) -> Result<Vec<PeriodRange>> {
    generate_ranges_with(reference_month, kind, breakdown, WeekStart::default())
}

pub fn generate_ranges_with(
    reference_month: NaiveDate,
    kind: PeriodKind,
    breakdown: Breakdown,
    week_start: WeekStart,
) -> Result<Vec<PeriodRange>> {
    let year = reference_month.year();
    let month = reference_month.month();

    let ranges = match (kind, breakdown) {
        (PeriodKind::Monthly, Breakdown::Total) => vec![month_range(year, month)?],
        (PeriodKind::Monthly, Breakdown::Detailed) => week_ranges(year, month, week_start)?,
        (PeriodKind::Quarterly, Breakdown::Total) => vec![quarter_range(year, quarter_of(month))?],
        (PeriodKind::Quarterly, Breakdown::Detailed) => (1..=quarter_of(month))
            .map(|q| quarter_range(year, q))
            .collect::<Result<Vec<_>>>()?,
        (PeriodKind::Yearly, Breakdown::Total) => vec![PeriodRange::new(
            first_day_of_month(year, 1)?,
            last_day_of_month(year, 12)?,
            year.to_string(),
        )],
        (PeriodKind::Yearly, Breakdown::Detailed) => (1..=month)
            .map(|m| month_range(year, m))
            .collect::<Result<Vec<_>>>()?,
        (PeriodKind::Trailing12, _) => (-11..=0)
            .map(|delta| {
                let (y, m) = add_months(year, month, delta);
                month_range(y, m)
            })
            .collect::<Result<Vec<_>>>()?,
    };

    debug!(
        "Generated {} range(s) for {:?}/{:?} around {}",
        ranges.len(),
        kind,
        breakdown,
        reference_month
    );

    Ok(ranges)
}

/// Checks that ranges are well formed, ascending and pairwise disjoint.
pub fn validate_ranges(ranges: &[PeriodRange]) -> Result<()> {
    for range in ranges {
        if range.end < range.start {
            return Err(AggregatorError::InvalidRange {
                label: range.label.clone(),
                start: range.start.to_string(),
                end: range.end.to_string(),
            });
        }
    }

    for pair in ranges.windows(2) {
        if pair[1].start <= pair[0].end {
            return Err(AggregatorError::DateError(format!(
                "Ranges '{}' and '{}' overlap or are out of order",
                pair[0].label, pair[1].label
            )));
        }
    }

    Ok(())
}

fn month_range(year: i32, month: u32) -> Result<PeriodRange> {
    Ok(PeriodRange::new(
        first_day_of_month(year, month)?,
        last_day_of_month(year, month)?,
        month_label(year, month),
    ))
}

fn quarter_range(year: i32, quarter: u32) -> Result<PeriodRange> {
    let start_month = quarter_start_month(quarter);
    Ok(PeriodRange::new(
        first_day_of_month(year, start_month)?,
        last_day_of_month(year, start_month + 2)?,
        format!("Q{} {}", quarter, year),
    ))
}

fn week_ranges(year: i32, month: u32, week_start: WeekStart) -> Result<Vec<PeriodRange>> {
    let month_start = first_day_of_month(year, month)?;
    let month_end = last_day_of_month(year, month)?;

    let mut ranges = Vec::new();
    let mut cursor = month_start;
    let mut week_number = 1;

    while cursor <= month_end {
        let offset = match week_start {
            WeekStart::Sunday => cursor.weekday().num_days_from_sunday(),
            WeekStart::Monday => cursor.weekday().num_days_from_monday(),
        };
        let week_end = cursor
            .checked_add_days(Days::new(u64::from(6 - offset)))
            .map_or(month_end, |d| d.min(month_end));

        ranges.push(PeriodRange::new(
            cursor,
            week_end,
            format!("Week {} ({}-{})", week_number, cursor.day(), week_end.day()),
        ));

        week_number += 1;
        cursor = match week_end.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }

    Ok(ranges)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_monthly_total() {
        let ranges = generate_ranges(date(2025, 6, 1), PeriodKind::Monthly, Breakdown::Total).unwrap();
        assert_eq!(ranges, vec![PeriodRange::new(date(2025, 6, 1), date(2025, 6, 30), "June 2025")]);
    }

    #[test]
    fn test_monthly_detailed_weeks_are_clipped() {
        // June 1st 2025 is a Sunday.
        let ranges =
            generate_ranges(date(2025, 6, 1), PeriodKind::Monthly, Breakdown::Detailed).unwrap();

        let labels: Vec<&str> = ranges.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Week 1 (1-7)",
                "Week 2 (8-14)",
                "Week 3 (15-21)",
                "Week 4 (22-28)",
                "Week 5 (29-30)"
            ]
        );
        assert_eq!(ranges.last().unwrap().num_days(), 2);
        validate_ranges(&ranges).unwrap();
    }

    #[test]
    fn test_monthly_detailed_short_first_week() {
        // May 1st 2025 is a Thursday.
        let ranges =
            generate_ranges(date(2025, 5, 1), PeriodKind::Monthly, Breakdown::Detailed).unwrap();
        assert_eq!(ranges[0].label, "Week 1 (1-3)");
        assert_eq!(ranges.last().unwrap().label, "Week 5 (25-31)");
        assert_eq!(ranges.first().unwrap().start, date(2025, 5, 1));
        assert_eq!(ranges.last().unwrap().end, date(2025, 5, 31));

        let monday =
            generate_ranges_with(date(2025, 5, 1), PeriodKind::Monthly, Breakdown::Detailed, WeekStart::Monday)
                .unwrap();
        assert_eq!(monday[0].label, "Week 1 (1-4)");
    }

    #[test]
    fn test_weeks_cover_month_without_gaps() {
        for month in 1..=12 {
            let ranges =
                generate_ranges(date(2024, month, 1), PeriodKind::Monthly, Breakdown::Detailed).unwrap();
            let days: i64 = ranges.iter().map(|r| r.num_days()).sum();
            let expected = last_day_of_month(2024, month).unwrap().day() as i64;
            assert_eq!(days, expected, "month {}", month);
            validate_ranges(&ranges).unwrap();
        }
    }

    #[test]
    fn test_quarterly() {
        let total =
            generate_ranges(date(2025, 5, 1), PeriodKind::Quarterly, Breakdown::Total).unwrap();
        assert_eq!(total, vec![PeriodRange::new(date(2025, 4, 1), date(2025, 6, 30), "Q2 2025")]);

        let detailed =
            generate_ranges(date(2025, 8, 1), PeriodKind::Quarterly, Breakdown::Detailed).unwrap();
        let labels: Vec<&str> = detailed.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["Q1 2025", "Q2 2025", "Q3 2025"]);
        assert_eq!(detailed[2].end, date(2025, 9, 30));
    }

    #[test]
    fn test_yearly() {
        let total = generate_ranges(date(2025, 3, 1), PeriodKind::Yearly, Breakdown::Total).unwrap();
        assert_eq!(total, vec![PeriodRange::new(date(2025, 1, 1), date(2025, 12, 31), "2025")]);

        let detailed =
            generate_ranges(date(2025, 3, 1), PeriodKind::Yearly, Breakdown::Detailed).unwrap();
        let labels: Vec<&str> = detailed.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["January 2025", "February 2025", "March 2025"]);
    }

    #[test]
    fn test_trailing_twelve_crosses_year() {
        for breakdown in [Breakdown::Total, Breakdown::Detailed] {
            let ranges = generate_ranges(date(2025, 6, 1), PeriodKind::Trailing12, breakdown).unwrap();
            assert_eq!(ranges.len(), 12);
            assert_eq!(ranges[0].label, "July 2024");
            assert_eq!(ranges[11].label, "June 2025");
            assert_eq!(ranges[0].start, date(2024, 7, 1));
            validate_ranges(&ranges).unwrap();
        }
    }

    #[test]
    fn test_validate_rejects_overlap() {
        let ranges = vec![
            PeriodRange::new(date(2025, 1, 1), date(2025, 1, 31), "A"),
            PeriodRange::new(date(2025, 1, 31), date(2025, 2, 28), "B"),
        ];
        assert!(validate_ranges(&ranges).is_err());

        let inverted = vec![PeriodRange::new(date(2025, 2, 1), date(2025, 1, 1), "C")];
        assert!(matches!(
            validate_ranges(&inverted),
            Err(AggregatorError::InvalidRange { .. })
        ));
    }
}
