pub mod agreements;
pub mod categories;
pub mod health;
pub mod installments;
pub mod schedule;
pub mod summary;
pub mod transactions;

use chrono::{NaiveDate, Utc};
use compute::ValidationError;
use sea_orm::ActiveEnum;

use crate::schemas::{ApiError, engine_error};

/// Parses the wire name of a stored enum (`"bank_transfer"`, `"approved"`, ...), ignoring case.
pub(crate) fn parse_enum<E>(kind: &'static str, value: &str) -> Result<E, ApiError>
where
    E: ActiveEnum<Value = String>,
{
    E::try_from_value(&value.trim().to_ascii_lowercase()).map_err(|_| {
        engine_error(
            ValidationError::UnknownValue {
                kind,
                value: value.to_string(),
            }
            .into(),
        )
    })
}

pub(crate) fn parse_optional_enum<E>(
    kind: &'static str,
    value: Option<&str>,
) -> Result<Option<E>, ApiError>
where
    E: ActiveEnum<Value = String>,
{
    value.map(|v| parse_enum(kind, v)).transpose()
}

/// The caller's `today`, or the current UTC date when none was given.
pub(crate) fn today_or_now(today: Option<NaiveDate>) -> NaiveDate {
    today.unwrap_or_else(|| Utc::now().date_naive())
}
