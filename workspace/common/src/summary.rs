use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::money::MoneyDto;

/// A calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct MonthPeriod {
    pub year: i32,
    /// Month number, 1-12
    pub month: u32,
}

impl MonthPeriod {
    /// Returns `None` when `month` is outside 1-12 or the year is out of chrono's range.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    /// First day of the month.
    pub fn start(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// Last day of the month.
    pub fn end(&self) -> Option<NaiveDate> {
        let (next_year, next_month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(next_year, next_month, 1).and_then(|d| d.pred_opt())
    }

    /// `YYYY-MM`, used as a label in reports.
    pub fn label(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

/// Income/expense roll-up of approved ledger entries for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FinancialSummaryDto {
    pub period: MonthPeriod,
    pub total_income: MoneyDto,
    pub total_expenses: MoneyDto,
    /// total_income - total_expenses; may be negative
    pub net_profit: MoneyDto,
    /// Approved expenses booked against the payroll category
    pub salary_expenses: MoneyDto,
    /// Approved expenses booked against the advance category
    pub advance_expenses: MoneyDto,
    /// Number of approved transactions that went into the figures
    pub transaction_count: usize,
}

/// Twelve monthly summaries and their year total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct YearlySummaryDto {
    pub year: i32,
    pub months: Vec<FinancialSummaryDto>,
    pub total_income: MoneyDto,
    pub total_expenses: MoneyDto,
    pub net_profit: MoneyDto,
    pub salary_expenses: MoneyDto,
    pub advance_expenses: MoneyDto,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_period_bounds() {
        let feb = MonthPeriod::new(2024, 2).unwrap();
        assert_eq!(feb.start(), NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(feb.end(), NaiveDate::from_ymd_opt(2024, 2, 29));

        let dec = MonthPeriod::new(2023, 12).unwrap();
        assert_eq!(dec.end(), NaiveDate::from_ymd_opt(2023, 12, 31));
        assert_eq!(dec.label(), "2023-12");
    }

    #[test]
    fn test_month_period_rejects_invalid_month() {
        assert!(MonthPeriod::new(2024, 0).is_none());
        assert!(MonthPeriod::new(2024, 13).is_none());
    }
}
