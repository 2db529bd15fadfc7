//! Month and year roll-ups of approved ledger entries.

use std::collections::HashSet;

use chrono::Datelike;
use common::{CurrencyCode, FinancialSummaryDto, MoneyDto, MonthPeriod, YearlySummaryDto};
use model::entities::account_category::{self, EntryType};
use model::entities::account_transaction::{self, TransactionStatus};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tracing::{debug, instrument};

use crate::error::{Result, ValidationError};
use crate::money::Money;
use crate::period::month_bounds;

/// Which categories count as payroll and advances. Matched by name, ignoring case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryPolicy {
    pub payroll_category: String,
    pub advance_category: String,
}

impl Default for SummaryPolicy {
    fn default() -> Self {
        Self {
            payroll_category: "Salary".to_string(),
            advance_category: "Advance".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinancialSummary {
    pub period: MonthPeriod,
    pub total_income: Money,
    pub total_expenses: Money,
    /// Income minus expenses; negative for a loss-making month.
    pub net_profit: Money,
    pub salary_expenses: Money,
    pub advance_expenses: Money,
    pub transaction_count: usize,
}

impl FinancialSummary {
    pub fn empty(period: MonthPeriod) -> Self {
        Self {
            period,
            total_income: Money::ZERO,
            total_expenses: Money::ZERO,
            net_profit: Money::ZERO,
            salary_expenses: Money::ZERO,
            advance_expenses: Money::ZERO,
            transaction_count: 0,
        }
    }

    pub fn to_dto(&self, currency: &CurrencyCode) -> FinancialSummaryDto {
        FinancialSummaryDto {
            period: self.period,
            total_income: MoneyDto::new(self.total_income.minor(), currency),
            total_expenses: MoneyDto::new(self.total_expenses.minor(), currency),
            net_profit: MoneyDto::new(self.net_profit.minor(), currency),
            salary_expenses: MoneyDto::new(self.salary_expenses.minor(), currency),
            advance_expenses: MoneyDto::new(self.advance_expenses.minor(), currency),
            transaction_count: self.transaction_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearlySummary {
    pub year: i32,
    /// January to December, always twelve entries.
    pub months: Vec<FinancialSummary>,
    pub total_income: Money,
    pub total_expenses: Money,
    pub net_profit: Money,
    pub salary_expenses: Money,
    pub advance_expenses: Money,
}

impl YearlySummary {
    pub fn to_dto(&self, currency: &CurrencyCode) -> YearlySummaryDto {
        YearlySummaryDto {
            year: self.year,
            months: self.months.iter().map(|m| m.to_dto(currency)).collect(),
            total_income: MoneyDto::new(self.total_income.minor(), currency),
            total_expenses: MoneyDto::new(self.total_expenses.minor(), currency),
            net_profit: MoneyDto::new(self.net_profit.minor(), currency),
            salary_expenses: MoneyDto::new(self.salary_expenses.minor(), currency),
            advance_expenses: MoneyDto::new(self.advance_expenses.minor(), currency),
        }
    }
}

fn period_of(year: i32, month: u32) -> Result<MonthPeriod> {
    MonthPeriod::new(year, month).ok_or_else(|| ValidationError::InvalidPeriod { year, month }.into())
}

fn category_ids(categories: &[account_category::Model], name: &str) -> HashSet<i32> {
    categories
        .iter()
        .filter(|c| c.is_named(name))
        .map(|c| c.id)
        .collect()
}

/// Rolls up `transactions` for `period`.
///
/// Only approved entries dated inside the period are counted; everything else is ignored,
/// so the caller may pass a wider set.
pub fn aggregate(
    period: MonthPeriod,
    transactions: &[account_transaction::Model],
    categories: &[account_category::Model],
    policy: &SummaryPolicy,
) -> Result<FinancialSummary> {
    let payroll = category_ids(categories, &policy.payroll_category);
    let advances = category_ids(categories, &policy.advance_category);

    let mut summary = FinancialSummary::empty(period);
    for transaction in transactions.iter().filter(|t| {
        t.status == TransactionStatus::Approved
            && t.transaction_date.year() == period.year
            && t.transaction_date.month() == period.month
    }) {
        let amount = Money::from_minor(transaction.amount);
        match transaction.transaction_type {
            EntryType::Income => {
                summary.total_income = summary.total_income.try_add(amount, "total income")?;
            }
            EntryType::Expense => {
                summary.total_expenses =
                    summary.total_expenses.try_add(amount, "total expenses")?;
                if payroll.contains(&transaction.category_id) {
                    summary.salary_expenses =
                        summary.salary_expenses.try_add(amount, "salary expenses")?;
                }
                if advances.contains(&transaction.category_id) {
                    summary.advance_expenses =
                        summary.advance_expenses.try_add(amount, "advance expenses")?;
                }
            }
        }
        summary.transaction_count += 1;
    }
    summary.net_profit = summary
        .total_income
        .try_sub(summary.total_expenses, "net profit")?;
    Ok(summary)
}

async fn approved_between(
    db: &DatabaseConnection,
    from: chrono::NaiveDate,
    to: chrono::NaiveDate,
) -> Result<Vec<account_transaction::Model>> {
    Ok(account_transaction::Entity::find()
        .filter(account_transaction::Column::Status.eq(TransactionStatus::Approved))
        .filter(account_transaction::Column::TransactionDate.between(from, to))
        .all(db)
        .await?)
}

/// Summary of approved transactions dated in `month` of `year`.
#[instrument(skip(db, policy))]
pub async fn summarize(
    db: &DatabaseConnection,
    year: i32,
    month: u32,
    policy: &SummaryPolicy,
) -> Result<FinancialSummary> {
    let period = period_of(year, month)?;
    let (start, end) = month_bounds(year, month)?;

    let transactions = approved_between(db, start, end).await?;
    let categories = account_category::Entity::find().all(db).await?;
    let summary = aggregate(period, &transactions, &categories, policy)?;

    debug!(
        "Summary {}: income {}, expenses {}, {} transaction(s)",
        period.label(),
        summary.total_income,
        summary.total_expenses,
        summary.transaction_count
    );
    Ok(summary)
}

/// Twelve month summaries for `year` plus their totals, from a single read.
#[instrument(skip(db, policy))]
pub async fn summarize_year(
    db: &DatabaseConnection,
    year: i32,
    policy: &SummaryPolicy,
) -> Result<YearlySummary> {
    let (start, _) = month_bounds(year, 1)?;
    let (_, end) = month_bounds(year, 12)?;

    let transactions = approved_between(db, start, end).await?;
    let categories = account_category::Entity::find().all(db).await?;

    let months = (1..=12)
        .map(|month| aggregate(period_of(year, month)?, &transactions, &categories, policy))
        .collect::<Result<Vec<_>>>()?;

    let total = |pick: fn(&FinancialSummary) -> Money, what: &'static str| {
        Money::try_sum(months.iter().map(pick), what)
    };
    let total_income = total(|m| m.total_income, "yearly income")?;
    let total_expenses = total(|m| m.total_expenses, "yearly expenses")?;

    Ok(YearlySummary {
        year,
        total_income,
        total_expenses,
        net_profit: total_income.try_sub(total_expenses, "yearly net profit")?,
        salary_expenses: total(|m| m.salary_expenses, "yearly salary expenses")?,
        advance_expenses: total(|m| m.advance_expenses, "yearly advance expenses")?,
        months,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{NewTransaction, approve_transaction, create_transaction};
    use crate::testing::{date, insert_category, setup_db};

    async fn approved(
        db: &DatabaseConnection,
        day: chrono::NaiveDate,
        transaction_type: EntryType,
        category_id: i32,
        amount: i64,
    ) {
        let created = create_transaction(
            db,
            NewTransaction::new(day, transaction_type, category_id, amount),
            "clerk-1",
        )
        .await
        .unwrap();
        approve_transaction(db, created.id, "manager-1").await.unwrap();
    }

    #[tokio::test]
    async fn test_month_summary_counts_only_approved() {
        let db = setup_db().await;
        let income = insert_category(&db, "Service Income", EntryType::Income).await;
        let salary = insert_category(&db, "Salary", EntryType::Expense).await;
        let advance = insert_category(&db, "Advance", EntryType::Expense).await;

        approved(&db, date(2024, 3, 2), EntryType::Income, income.id, 5_000).await;
        approved(&db, date(2024, 3, 10), EntryType::Expense, salary.id, 2_000).await;
        approved(&db, date(2024, 3, 31), EntryType::Expense, advance.id, 500).await;
        create_transaction(
            &db,
            NewTransaction::new(date(2024, 3, 15), EntryType::Income, income.id, 9_999),
            "clerk-1",
        )
        .await
        .unwrap();
        // Outside the month.
        approved(&db, date(2024, 4, 1), EntryType::Income, income.id, 1_000).await;

        let summary = summarize(&db, 2024, 3, &SummaryPolicy::default())
            .await
            .unwrap();
        assert_eq!(summary.total_income.minor(), 5_000);
        assert_eq!(summary.total_expenses.minor(), 2_500);
        assert_eq!(summary.net_profit.minor(), 2_500);
        assert_eq!(summary.salary_expenses.minor(), 2_000);
        assert_eq!(summary.advance_expenses.minor(), 500);
        assert_eq!(summary.transaction_count, 3);
    }

    #[tokio::test]
    async fn test_empty_month_is_all_zero() {
        let db = setup_db().await;
        let summary = summarize(&db, 2024, 2, &SummaryPolicy::default())
            .await
            .unwrap();
        assert_eq!(summary, FinancialSummary::empty(MonthPeriod::new(2024, 2).unwrap()));
    }

    #[tokio::test]
    async fn test_invalid_month() {
        let db = setup_db().await;
        for month in [0, 13] {
            let err = summarize(&db, 2024, month, &SummaryPolicy::default())
                .await
                .unwrap_err();
            assert_eq!(err.code(), "INVALID_PERIOD");
        }
    }

    #[tokio::test]
    async fn test_configured_category_names() {
        let db = setup_db().await;
        let wages = insert_category(&db, "Wages", EntryType::Expense).await;
        approved(&db, date(2024, 5, 3), EntryType::Expense, wages.id, 800).await;

        let default_policy = summarize(&db, 2024, 5, &SummaryPolicy::default())
            .await
            .unwrap();
        assert_eq!(default_policy.salary_expenses, Money::ZERO);

        let policy = SummaryPolicy {
            payroll_category: "WAGES".to_string(),
            ..Default::default()
        };
        let summary = summarize(&db, 2024, 5, &policy).await.unwrap();
        assert_eq!(summary.salary_expenses.minor(), 800);
        assert_eq!(summary.net_profit.minor(), -800);
    }

    #[tokio::test]
    async fn test_year_summary() {
        let db = setup_db().await;
        let income = insert_category(&db, "Service Income", EntryType::Income).await;
        let salary = insert_category(&db, "Salary", EntryType::Expense).await;

        approved(&db, date(2024, 1, 5), EntryType::Income, income.id, 10_000).await;
        approved(&db, date(2024, 1, 28), EntryType::Expense, salary.id, 4_000).await;
        approved(&db, date(2024, 12, 31), EntryType::Income, income.id, 3_000).await;
        approved(&db, date(2025, 1, 1), EntryType::Income, income.id, 99_000).await;

        let year = summarize_year(&db, 2024, &SummaryPolicy::default())
            .await
            .unwrap();
        assert_eq!(year.months.len(), 12);
        assert_eq!(year.months[0].net_profit.minor(), 6_000);
        assert_eq!(year.months[11].total_income.minor(), 3_000);
        assert_eq!(year.months[5].transaction_count, 0);
        assert_eq!(year.total_income.minor(), 13_000);
        assert_eq!(year.total_expenses.minor(), 4_000);
        assert_eq!(year.net_profit.minor(), 9_000);
        assert_eq!(year.salary_expenses.minor(), 4_000);
    }

    #[test]
    fn test_dto_carries_currency() {
        let currency = CurrencyCode::parse("INR").unwrap();
        let summary = FinancialSummary {
            total_income: Money::from_minor(123_45),
            net_profit: Money::from_minor(123_45),
            ..FinancialSummary::empty(MonthPeriod::new(2024, 3).unwrap())
        };
        let dto = summary.to_dto(&currency);
        assert_eq!(dto.total_income.minor_units, 12_345);
        assert_eq!(dto.total_income.currency, "INR");
        assert_eq!(dto.period.label(), "2024-03");
    }
}
