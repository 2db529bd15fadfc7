use chrono::NaiveDate;
use sea_orm::entity::prelude::*;

use super::agreement::PaymentMode;
use super::{agreement, installment};

/// Receipt for money actually received against an installment. Never updated.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "payment_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub installment_id: i32,
    /// Copied from the installment so reports do not need the join.
    pub agreement_id: i32,
    pub payment_date: NaiveDate,
    /// May differ from the installment amount (partial or over payment); kept as received.
    pub amount_paid: i64,
    pub payment_method: PaymentMode,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
    pub recorded_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "installment::Entity",
        from = "Column::InstallmentId",
        to = "installment::Column::Id",
        on_delete = "Cascade"
    )]
    Installment,
    #[sea_orm(
        belongs_to = "agreement::Entity",
        from = "Column::AgreementId",
        to = "agreement::Column::Id",
        on_delete = "Cascade"
    )]
    Agreement,
}

impl Related<installment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Installment.def()
    }
}

impl Related<agreement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Agreement.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
