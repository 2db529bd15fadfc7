//! Calendar helpers used by scheduling, bucketing and summaries.

use chrono::{Datelike, Duration, Months, NaiveDate};

use crate::error::{Result, ValidationError};

/// Adds `months` calendar months, clamping the day to the target month's length
/// (Jan 31 + 1 month is Feb 28/29, never a day in March).
pub fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate> {
    date.checked_add_months(Months::new(months)).ok_or_else(|| {
        ValidationError::InvalidSchedule(format!("{date} + {months} months is out of range"))
            .into()
    })
}

pub fn add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    date.checked_add_signed(Duration::days(days))
}

/// Returns the number of days in the given month of the given year.
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    month_end(year, month).map(|d| d.day())
}

pub fn month_start(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

pub fn month_end(year: i32, month: u32) -> Option<NaiveDate> {
    month_start(year, month)?
        .checked_add_months(Months::new(1))?
        .pred_opt()
}

/// First and last day of a month, or `InvalidPeriod` for a bad month number.
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate)> {
    match (month_start(year, month), month_end(year, month)) {
        (Some(start), Some(end)) => Ok((start, end)),
        _ => Err(ValidationError::InvalidPeriod { year, month }.into()),
    }
}

pub fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ComputeError;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_add_months_plain() {
        assert_eq!(add_months(date(2024, 1, 15), 1).unwrap(), date(2024, 2, 15));
        assert_eq!(add_months(date(2024, 1, 15), 11).unwrap(), date(2024, 12, 15));
        assert_eq!(add_months(date(2024, 11, 15), 3).unwrap(), date(2025, 2, 15));
        assert_eq!(add_months(date(2024, 1, 15), 0).unwrap(), date(2024, 1, 15));
    }

    #[test]
    fn test_add_months_clamps_month_end() {
        assert_eq!(add_months(date(2024, 1, 31), 1).unwrap(), date(2024, 2, 29));
        assert_eq!(add_months(date(2023, 1, 31), 1).unwrap(), date(2023, 2, 28));
        assert_eq!(add_months(date(2024, 1, 31), 3).unwrap(), date(2024, 4, 30));
        assert_eq!(add_months(date(2024, 8, 31), 6).unwrap(), date(2025, 2, 28));
    }

    #[test]
    fn test_month_bounds() {
        assert_eq!(
            month_bounds(2024, 2).unwrap(),
            (date(2024, 2, 1), date(2024, 2, 29))
        );
        assert_eq!(
            month_bounds(2024, 12).unwrap(),
            (date(2024, 12, 1), date(2024, 12, 31))
        );
        assert!(matches!(
            month_bounds(2024, 13),
            Err(ComputeError::Validation(ValidationError::InvalidPeriod {
                year: 2024,
                month: 13
            }))
        ));
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 2), Some(29));
        assert_eq!(days_in_month(2023, 2), Some(28));
        assert_eq!(days_in_month(2024, 4), Some(30));
        assert_eq!(days_in_month(2024, 0), None);
    }

    #[test]
    fn test_add_days_and_same_month() {
        assert_eq!(add_days(date(2024, 2, 28), 1), Some(date(2024, 2, 29)));
        assert_eq!(add_days(date(2024, 3, 1), -7), Some(date(2024, 2, 23)));
        assert!(same_month(date(2024, 3, 1), date(2024, 3, 31)));
        assert!(!same_month(date(2024, 3, 1), date(2023, 3, 1)));
    }
}
