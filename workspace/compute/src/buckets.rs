//! Time-relative views over pending installments.
//!
//! Nothing here reads a clock: every function takes `today` explicitly. Paid installments
//! never fall into any bucket.

use chrono::NaiveDate;
use model::entities::installment::{self, InstallmentStatus};

use crate::error::{Result, ValidationError};
use crate::period::same_month;
use crate::schedule::REMINDER_LEAD_DAYS;

/// Collections bucket of a pending installment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// Due date falls in the calendar month of `today`.
    ThisMonth,
    /// Due between today and seven days from today, both inclusive.
    Upcoming,
    /// Due strictly before today.
    Overdue,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::ThisMonth => "this_month",
            Bucket::Upcoming => "upcoming",
            Bucket::Overdue => "overdue",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "this_month" => Ok(Bucket::ThisMonth),
            "upcoming" => Ok(Bucket::Upcoming),
            "overdue" => Ok(Bucket::Overdue),
            _ => Err(ValidationError::UnknownValue {
                kind: "bucket",
                value: value.to_string(),
            }
            .into()),
        }
    }
}

/// Signed number of days from `today` to `due_date`; negative once the date has passed.
pub fn days_until_due(due_date: NaiveDate, today: NaiveDate) -> i64 {
    (due_date - today).num_days()
}

fn is_pending(installment: &installment::Model) -> bool {
    installment.status == InstallmentStatus::Pending
}

pub fn is_due_this_month(installment: &installment::Model, today: NaiveDate) -> bool {
    is_pending(installment) && same_month(installment.due_date, today)
}

pub fn is_upcoming(installment: &installment::Model, today: NaiveDate) -> bool {
    let days = days_until_due(installment.due_date, today);
    is_pending(installment) && (0..=REMINDER_LEAD_DAYS).contains(&days)
}

/// Due today is not overdue yet.
pub fn is_overdue(installment: &installment::Model, today: NaiveDate) -> bool {
    is_pending(installment) && installment.due_date < today
}

pub fn in_bucket(installment: &installment::Model, bucket: Bucket, today: NaiveDate) -> bool {
    match bucket {
        Bucket::ThisMonth => is_due_this_month(installment, today),
        Bucket::Upcoming => is_upcoming(installment, today),
        Bucket::Overdue => is_overdue(installment, today),
    }
}

/// Every bucket the installment belongs to. The buckets overlap, so this may hold several.
pub fn buckets_of(installment: &installment::Model, today: NaiveDate) -> Vec<Bucket> {
    [Bucket::Overdue, Bucket::Upcoming, Bucket::ThisMonth]
        .into_iter()
        .filter(|bucket| in_bucket(installment, *bucket, today))
        .collect()
}

/// The single most urgent bucket: overdue, then upcoming, then this month.
pub fn urgency(installment: &installment::Model, today: NaiveDate) -> Option<Bucket> {
    buckets_of(installment, today).into_iter().next()
}

/// Filters `installments` down to the members of `bucket`, ordered by due date.
pub fn classify(
    installments: Vec<installment::Model>,
    bucket: Bucket,
    today: NaiveDate,
) -> Vec<installment::Model> {
    let mut selected: Vec<installment::Model> = installments
        .into_iter()
        .filter(|i| in_bucket(i, bucket, today))
        .collect();
    selected.sort_by_key(|i| (i.due_date, i.agreement_id, i.payment_number));
    selected
}
