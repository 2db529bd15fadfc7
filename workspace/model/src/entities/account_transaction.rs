use chrono::NaiveDate;
use sea_orm::entity::prelude::*;

use super::account_category::{self, EntryType};
use super::agreement::PaymentMode;
use super::installment;

/// Approval state of a ledger entry. Only approved rows count towards summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
pub enum TransactionStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

/// A manually or system entered income/expense event: salaries, advances,
/// ad-hoc expenses, miscellaneous income, mirrored collections.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "account_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub transaction_date: NaiveDate,
    pub transaction_type: EntryType,
    pub category_id: i32,
    /// Non-negative amount in minor currency units; the direction comes from the type.
    pub amount: i64,
    pub payment_method: PaymentMode,
    pub vendor_customer: Option<String>,
    pub invoice_number: Option<String>,
    pub receipt_number: Option<String>,
    pub reference_number: Option<String>,
    pub description: Option<String>,
    /// Set when the entry mirrors a collected installment.
    pub installment_id: Option<i32>,
    /// Opaque reference to a service ticket kept outside this service.
    pub service_ticket_id: Option<i32>,
    pub status: TransactionStatus,
    pub created_by: String,
    pub approved_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "account_category::Entity",
        from = "Column::CategoryId",
        to = "account_category::Column::Id",
        on_delete = "Restrict"
    )]
    Category,
    #[sea_orm(
        belongs_to = "installment::Entity",
        from = "Column::InstallmentId",
        to = "installment::Column::Id",
        on_delete = "SetNull"
    )]
    Installment,
}

impl Related<account_category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
