use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use utoipa::ToSchema;

/// Returned when a currency code is not a known ISO-4217 code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown ISO-4217 currency code '{0}'")]
pub struct UnknownCurrency(pub String);

/// A validated ISO-4217 currency together with its minor-unit exponent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyCode {
    code: &'static str,
    exponent: u32,
}

impl CurrencyCode {
    /// Resolves `code` (case-insensitive) against the ISO-4217 table.
    pub fn parse(code: &str) -> Result<Self, UnknownCurrency> {
        let normalized = code.trim().to_ascii_uppercase();
        rusty_money::iso::find(&normalized)
            .map(|currency| Self {
                code: currency.iso_alpha_code,
                exponent: currency.exponent,
            })
            .ok_or_else(|| UnknownCurrency(code.to_string()))
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Number of decimal places between major and minor units (2 for INR, 0 for JPY).
    pub fn exponent(&self) -> u32 {
        self.exponent
    }

    /// Renders a minor-unit amount in major units, e.g. `123456` INR as `1234.56`.
    pub fn format_minor(&self, minor_units: i64) -> String {
        Decimal::try_new(minor_units, self.exponent)
            .map(|major| major.to_string())
            .unwrap_or_else(|_| minor_units.to_string())
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code)
    }
}

/// Monetary amount as it appears in API payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MoneyDto {
    /// Amount in minor currency units (e.g. paise)
    pub minor_units: i64,
    /// ISO-4217 currency code
    pub currency: String,
    /// Human readable amount in major units; informational only
    pub display: String,
}

impl MoneyDto {
    pub fn new(minor_units: i64, currency: &CurrencyCode) -> Self {
        Self {
            minor_units,
            currency: currency.code().to_string(),
            display: currency.format_minor(minor_units),
        }
    }
}
