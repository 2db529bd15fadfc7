use chrono::{NaiveDate, NaiveDateTime};
use sea_orm::entity::prelude::*;

use super::{installment, payment_record};

/// How the total cost of an agreement is split into installments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum PaymentFrequency {
    #[sea_orm(string_value = "full")]
    Full,
    #[sea_orm(string_value = "half_yearly")]
    HalfYearly,
    #[sea_orm(string_value = "quarterly")]
    Quarterly,
    #[sea_orm(string_value = "three_times")]
    ThreeTimes,
    #[sea_orm(string_value = "monthly")]
    Monthly,
}

/// How money changes hands. Informational on agreements, recorded on receipts and ledger rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum PaymentMode {
    #[sea_orm(string_value = "cash")]
    Cash,
    #[sea_orm(string_value = "cheque")]
    Cheque,
    #[sea_orm(string_value = "bank_transfer")]
    BankTransfer,
    #[sea_orm(string_value = "other")]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum AgreementStatus {
    #[sea_orm(string_value = "active")]
    Active,
    /// Every installment has been paid.
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// A signed equipment-service contract with a client.
///
/// All monetary columns hold integer minor currency units. `subtotal` and `total_cost`
/// are derived from the line items and are rewritten together with them.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "agreements")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Opaque reference to the client record kept outside this service.
    pub client_id: i32,
    pub agreement_date: NaiveDate,

    pub desktop_count: i32,
    pub desktop_rate: i64,
    pub laptop_count: i32,
    pub laptop_rate: i64,
    pub printer_count: i32,
    pub printer_rate: i64,
    pub server_count: i32,
    pub server_rate: i64,
    pub scanner_count: i32,
    pub scanner_rate: i64,
    /// Flat charge for networking work, not multiplied by any count.
    pub networking_charge: i64,
    pub discount: i64,

    pub subtotal: i64,
    /// `subtotal - discount`, clamped at zero.
    pub total_cost: i64,

    pub payment_frequency: PaymentFrequency,
    pub payment_mode: PaymentMode,
    pub status: AgreementStatus,
    pub notes: Option<String>,
    /// Bumped by every write that touches the agreement or its schedule.
    pub version: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::installment::Entity")]
    Installment,
    #[sea_orm(has_many = "super::payment_record::Entity")]
    PaymentRecord,
}

impl Related<installment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Installment.def()
    }
}

impl Related<payment_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentRecord.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
