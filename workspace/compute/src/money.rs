//! Fixed-point money on integer minor units.

use std::fmt;
use std::iter::Sum;

use crate::error::{Result, ValidationError};

/// An amount in minor currency units (e.g. paise). Never a float.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_minor(minor_units: i64) -> Self {
        Money(minor_units)
    }

    /// Like [`Money::from_minor`] but rejects negative input, naming the offending field.
    pub fn non_negative(field: &'static str, minor_units: i64) -> Result<Self> {
        if minor_units < 0 {
            return Err(ValidationError::NegativeAmount {
                field,
                value: minor_units,
            }
            .into());
        }
        Ok(Money(minor_units))
    }

    pub const fn minor(self) -> i64 {
        self.0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    pub fn checked_mul(self, factor: i64) -> Option<Money> {
        self.0.checked_mul(factor).map(Money)
    }

    /// Adds, turning overflow into a validation error tagged with `what`.
    pub fn try_add(self, other: Money, what: &'static str) -> Result<Money> {
        self.checked_add(other)
            .ok_or_else(|| ValidationError::AmountOverflow(what).into())
    }

    pub fn try_sub(self, other: Money, what: &'static str) -> Result<Money> {
        self.checked_sub(other)
            .ok_or_else(|| ValidationError::AmountOverflow(what).into())
    }

    /// Sums an iterator, failing on overflow instead of wrapping.
    pub fn try_sum<I>(amounts: I, what: &'static str) -> Result<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, |acc, amount| acc.try_add(amount, what))
    }

    /// Splits the amount into `parts` shares that add up to exactly `self`.
    ///
    /// Every share gets `self / parts`; the remainder is handed out one minor unit at a time
    /// to the first shares, so shares differ by at most one unit and earlier ones are never smaller.
    pub fn allocate(self, parts: usize) -> Result<Vec<Money>> {
        if parts == 0 {
            return Err(ValidationError::InvalidSchedule(
                "cannot split an amount into zero installments".to_string(),
            )
            .into());
        }
        if self.is_negative() {
            return Err(ValidationError::InvalidSchedule(format!(
                "cannot split a negative amount ({})",
                self.0
            ))
            .into());
        }

        let n = i64::try_from(parts).map_err(|_| {
            ValidationError::InvalidSchedule(format!("too many installments ({parts})"))
        })?;
        let base = self.0 / n;
        let remainder = self.0 % n;

        Ok((0..n)
            .map(|i| Money(base + i64::from(i < remainder)))
            .collect())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Money> for i64 {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl Sum for Money {
    /// Saturating sum for display purposes; use [`Money::try_sum`] where exactness matters.
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        Money(iter.fold(0i64, |acc, m| acc.saturating_add(m.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ComputeError;

    #[test]
    fn test_allocate_even_split() {
        let shares = Money::from_minor(120_000).allocate(12).unwrap();
        assert_eq!(shares.len(), 12);
        assert!(shares.iter().all(|s| s.minor() == 10_000));
    }

    #[test]
    fn test_allocate_distributes_remainder_to_first_shares() {
        let shares = Money::from_minor(100).allocate(3).unwrap();
        assert_eq!(
            shares,
            vec![Money::from_minor(34), Money::from_minor(33), Money::from_minor(33)]
        );

        let shares = Money::from_minor(11).allocate(4).unwrap();
        assert_eq!(
            shares.iter().map(|m| m.minor()).collect::<Vec<_>>(),
            vec![3, 3, 3, 2]
        );
    }

    #[test]
    fn test_allocate_sum_is_exact() {
        for total in [0i64, 1, 2, 7, 99, 100, 101, 999_999, 1_234_567_891] {
            for parts in [1usize, 2, 3, 4, 12] {
                let shares = Money::from_minor(total).allocate(parts).unwrap();
                let sum = Money::try_sum(shares.iter().copied(), "test").unwrap();
                assert_eq!(sum.minor(), total, "total={total} parts={parts}");

                let max = shares.iter().max().unwrap().minor();
                let min = shares.iter().min().unwrap().minor();
                assert!(max - min <= 1);
            }
        }
    }

    #[test]
    fn test_allocate_smaller_than_parts() {
        let shares = Money::from_minor(2).allocate(12).unwrap();
        assert_eq!(shares.iter().filter(|m| m.minor() == 1).count(), 2);
        assert_eq!(shares.iter().filter(|m| m.minor() == 0).count(), 10);
    }

    #[test]
    fn test_allocate_rejects_zero_parts_and_negative_total() {
        assert!(matches!(
            Money::from_minor(100).allocate(0),
            Err(ComputeError::Validation(ValidationError::InvalidSchedule(_)))
        ));
        assert!(matches!(
            Money::from_minor(-1).allocate(2),
            Err(ComputeError::Validation(ValidationError::InvalidSchedule(_)))
        ));
    }

    #[test]
    fn test_non_negative() {
        assert_eq!(Money::non_negative("amount", 5).unwrap(), Money::from_minor(5));
        assert!(matches!(
            Money::non_negative("amount", -5),
            Err(ComputeError::Validation(ValidationError::NegativeAmount {
                field: "amount",
                value: -5
            }))
        ));
    }

    #[test]
    fn test_try_sum_overflow() {
        let result = Money::try_sum([Money::from_minor(i64::MAX), Money::from_minor(1)], "total");
        assert!(matches!(
            result,
            Err(ComputeError::Validation(ValidationError::AmountOverflow("total")))
        ));
    }
}
