//! Turns an agreement's total cost and payment frequency into an installment schedule.

use chrono::NaiveDate;
use model::entities::agreement::PaymentFrequency;
use sea_orm::ActiveEnum;
use tracing::{debug, instrument};

use crate::error::{Result, ValidationError};
use crate::money::Money;
use crate::period::{add_days, add_months};

/// Days before the due date at which a reminder becomes relevant.
pub const REMINDER_LEAD_DAYS: i64 = 7;

/// Number of installments and their spacing for each frequency.
pub trait FrequencyPolicy {
    fn installment_count(&self) -> usize;
    /// Months between consecutive due dates.
    fn month_step(&self) -> u32;
}

impl FrequencyPolicy for PaymentFrequency {
    fn installment_count(&self) -> usize {
        match self {
            PaymentFrequency::Full => 1,
            PaymentFrequency::HalfYearly => 2,
            PaymentFrequency::ThreeTimes => 3,
            PaymentFrequency::Quarterly => 4,
            PaymentFrequency::Monthly => 12,
        }
    }

    fn month_step(&self) -> u32 {
        match self {
            PaymentFrequency::Full => 0,
            PaymentFrequency::HalfYearly => 6,
            PaymentFrequency::ThreeTimes => 4,
            PaymentFrequency::Quarterly => 3,
            PaymentFrequency::Monthly => 1,
        }
    }
}

/// Parses the wire name of a frequency (`full`, `half_yearly`, `quarterly`, `three_times`, `monthly`).
pub fn parse_frequency(value: &str) -> Result<PaymentFrequency> {
    PaymentFrequency::try_from_value(&value.trim().to_ascii_lowercase())
        .map_err(|_| ValidationError::UnknownFrequency(value.to_string()).into())
}

/// One row of a generated schedule, before it is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledInstallment {
    /// 1-based, in due-date order.
    pub payment_number: i32,
    pub due_date: NaiveDate,
    pub amount: Money,
}

impl ScheduledInstallment {
    /// Date from which a reminder for this installment is due. Derived, not stored.
    pub fn reminder_date(&self) -> Option<NaiveDate> {
        reminder_date(self.due_date)
    }
}

pub fn reminder_date(due_date: NaiveDate) -> Option<NaiveDate> {
    add_days(due_date, -REMINDER_LEAD_DAYS)
}

/// Generates the installment schedule for an agreement.
///
/// The total is split in minor units; the first `total % n` installments carry one extra unit
/// so the amounts always add up to `total` exactly. Due date `k` is `agreement_date + k * step`
/// months, computed from the start date each time so month-end dates clamp without drifting.
#[instrument(skip_all, fields(total = %total, agreement_date = %agreement_date, frequency = ?frequency))]
pub fn generate(
    total: Money,
    agreement_date: NaiveDate,
    frequency: PaymentFrequency,
) -> Result<Vec<ScheduledInstallment>> {
    if total.is_negative() {
        return Err(ValidationError::InvalidSchedule(format!(
            "total must not be negative (got {total})"
        ))
        .into());
    }

    let count = frequency.installment_count();
    let step = frequency.month_step();
    let amounts = total.allocate(count)?;

    let mut schedule = Vec::with_capacity(count);
    for (index, amount) in amounts.into_iter().enumerate() {
        let offset = u32::try_from(index)
            .ok()
            .and_then(|i| i.checked_mul(step))
            .ok_or_else(|| ValidationError::InvalidSchedule("month offset overflow".to_string()))?;
        let payment_number = i32::try_from(index + 1)
            .map_err(|_| ValidationError::InvalidSchedule("too many installments".to_string()))?;

        schedule.push(ScheduledInstallment {
            payment_number,
            due_date: add_months(agreement_date, offset)?,
            amount,
        });
    }

    debug!(
        "Generated {} installments for total {} starting {}",
        schedule.len(),
        total,
        agreement_date
    );
    Ok(schedule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ComputeError;
    use sea_orm::Iterable;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_full_is_single_installment_on_agreement_date() {
        let schedule = generate(Money::from_minor(50_000), date(2024, 3, 10), PaymentFrequency::Full)
            .unwrap();
        assert_eq!(
            schedule,
            vec![ScheduledInstallment {
                payment_number: 1,
                due_date: date(2024, 3, 10),
                amount: Money::from_minor(50_000),
            }]
        );
    }

    #[test]
    fn test_monthly_twelve_installments_on_same_day() {
        let schedule = generate(
            Money::from_minor(120_000),
            date(2024, 1, 15),
            PaymentFrequency::Monthly,
        )
        .unwrap();

        assert_eq!(schedule.len(), 12);
        for (i, installment) in schedule.iter().enumerate() {
            assert_eq!(installment.payment_number, i as i32 + 1);
            assert_eq!(installment.amount, Money::from_minor(10_000));
            assert_eq!(installment.due_date, date(2024, 1 + i as u32, 15));
        }
    }

    #[test]
    fn test_monthly_from_month_end_clamps_without_drift() {
        let schedule = generate(
            Money::from_minor(120_000),
            date(2024, 1, 31),
            PaymentFrequency::Monthly,
        )
        .unwrap();

        let due: Vec<NaiveDate> = schedule.iter().map(|s| s.due_date).collect();
        assert_eq!(due[0], date(2024, 1, 31));
        assert_eq!(due[1], date(2024, 2, 29));
        // March goes back to the 31st, it is not dragged down to the 29th.
        assert_eq!(due[2], date(2024, 3, 31));
        assert_eq!(due[3], date(2024, 4, 30));
        assert_eq!(due[11], date(2024, 12, 31));
    }

    #[test]
    fn test_spacing_per_frequency() {
        let start = date(2024, 1, 15);
        let cases = [
            (PaymentFrequency::HalfYearly, vec![date(2024, 1, 15), date(2024, 7, 15)]),
            (
                PaymentFrequency::Quarterly,
                vec![date(2024, 1, 15), date(2024, 4, 15), date(2024, 7, 15), date(2024, 10, 15)],
            ),
            (
                PaymentFrequency::ThreeTimes,
                vec![date(2024, 1, 15), date(2024, 5, 15), date(2024, 9, 15)],
            ),
        ];

        for (frequency, expected) in cases {
            let schedule = generate(Money::from_minor(1_000), start, frequency).unwrap();
            let due: Vec<NaiveDate> = schedule.iter().map(|s| s.due_date).collect();
            assert_eq!(due, expected, "{frequency:?}");
        }
    }

    #[test]
    fn test_sum_invariant_for_every_frequency() {
        let totals = [0i64, 1, 5, 11, 100, 1_001, 99_999, 120_000, 7_777_777, 1_000_000_007];
        for frequency in PaymentFrequency::iter() {
            for total in totals {
                let schedule =
                    generate(Money::from_minor(total), date(2024, 5, 31), frequency).unwrap();
                assert_eq!(schedule.len(), frequency.installment_count());

                let sum: i64 = schedule.iter().map(|s| s.amount.minor()).sum();
                assert_eq!(sum, total, "{frequency:?} total={total}");

                // Numbers are 1..n and due dates ascend.
                for (i, pair) in schedule.windows(2).enumerate() {
                    assert_eq!(pair[0].payment_number, i as i32 + 1);
                    assert!(pair[0].due_date < pair[1].due_date);
                }
            }
        }
    }

    #[test]
    fn test_remainder_goes_to_first_installments() {
        let schedule = generate(
            Money::from_minor(100_003),
            date(2024, 1, 1),
            PaymentFrequency::Quarterly,
        )
        .unwrap();
        let amounts: Vec<i64> = schedule.iter().map(|s| s.amount.minor()).collect();
        assert_eq!(amounts, vec![25_001, 25_001, 25_001, 25_000]);
    }

    #[test]
    fn test_negative_total_is_rejected() {
        let result = generate(Money::from_minor(-1), date(2024, 1, 1), PaymentFrequency::Full);
        assert!(matches!(
            result,
            Err(ComputeError::Validation(ValidationError::InvalidSchedule(_)))
        ));
    }

    #[test]
    fn test_reminder_date_is_seven_days_before_due() {
        let schedule =
            generate(Money::from_minor(10), date(2024, 3, 5), PaymentFrequency::Full).unwrap();
        assert_eq!(schedule[0].reminder_date(), Some(date(2024, 2, 27)));
    }

    #[test]
    fn test_parse_frequency() {
        assert_eq!(parse_frequency("monthly").unwrap(), PaymentFrequency::Monthly);
        assert_eq!(parse_frequency("Three_Times").unwrap(), PaymentFrequency::ThreeTimes);
        assert!(matches!(
            parse_frequency("weekly"),
            Err(ComputeError::Validation(ValidationError::UnknownFrequency(_)))
        ));
    }
}
