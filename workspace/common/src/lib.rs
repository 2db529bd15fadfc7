//! Transport-layer types shared by the HTTP handlers and the CLI.
//! Money always crosses the wire as integer minor units plus an ISO-4217 code.

mod money;
mod summary;

pub use money::{CurrencyCode, MoneyDto, UnknownCurrency};
pub use summary::{FinancialSummaryDto, MonthPeriod, YearlySummaryDto};
