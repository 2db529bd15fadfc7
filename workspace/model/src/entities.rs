//! Root of the SeaORM entity modules.
//! One module per persisted record of the billing and collections ledger.

pub mod account_category;
pub mod account_transaction;
pub mod agreement;
pub mod installment;
pub mod payment_record;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::account_category::Entity as AccountCategory;
    pub use super::account_transaction::Entity as AccountTransaction;
    pub use super::agreement::Entity as Agreement;
    pub use super::installment::Entity as Installment;
    pub use super::payment_record::Entity as PaymentRecord;
}
