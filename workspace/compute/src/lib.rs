//! Billing and collections engine.
//!
//! Pure building blocks (`money`, `period`, `schedule`, `buckets`) sit under the store-backed
//! operations (`agreement`, `collections`, `ledger`, `summary`). Every store-backed operation
//! that writes runs inside a single database transaction.

pub mod agreement;
pub mod buckets;
pub mod collections;
pub mod error;
pub mod ledger;
pub mod money;
pub mod period;
pub mod schedule;
pub mod summary;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{ComputeError, Result, StateConflict, ValidationError};
pub use money::Money;
