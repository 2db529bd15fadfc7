use chrono::NaiveDate;
use sea_orm::entity::prelude::*;

use super::{agreement, payment_record};

/// Persisted lifecycle of an installment.
///
/// Overdue is deliberately absent: it is a view over pending rows computed from the due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(15))")]
pub enum InstallmentStatus {
    #[sea_orm(string_value = "pending")]
    Pending, // Scheduled, not yet collected.
    #[sea_orm(string_value = "paid")]
    Paid, // A payment record exists. Terminal.
}

/// One scheduled collection event of an agreement.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "installments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub agreement_id: i32,

    /// 1-based position in the schedule, gapless per agreement.
    pub payment_number: i32,

    pub due_date: NaiveDate,

    /// Scheduled amount in minor currency units.
    pub amount: i64,

    pub status: InstallmentStatus,

    #[sea_orm(default_value = "false")]
    pub reminder_sent: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "agreement::Entity",
        from = "Column::AgreementId",
        to = "agreement::Column::Id",
        on_delete = "Cascade"
    )]
    Agreement,
    #[sea_orm(has_many = "super::payment_record::Entity")]
    PaymentRecord,
}

impl Related<agreement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Agreement.def()
    }
}

impl Related<payment_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentRecord.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
