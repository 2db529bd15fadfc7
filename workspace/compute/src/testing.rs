//! Shared fixtures for the engine's database tests.

use chrono::NaiveDate;
use migration::{Migrator, MigratorTrait};
use model::entities::account_category::{self, EntryType};
use model::entities::agreement::{PaymentFrequency, PaymentMode};
use sea_orm::{ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, Set};

use crate::agreement::{NewAgreement, Pricing};

pub async fn setup_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    db.execute_unprepared("PRAGMA foreign_keys = ON;")
        .await
        .unwrap();
    Migrator::up(&db, None).await.expect("Migrations failed.");
    db
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A monthly agreement whose whole price is the networking charge, so `total` is exact.
pub fn monthly_agreement(total: i64, agreement_date: NaiveDate) -> NewAgreement {
    agreement_with(total, agreement_date, PaymentFrequency::Monthly)
}

pub fn agreement_with(
    total: i64,
    agreement_date: NaiveDate,
    payment_frequency: PaymentFrequency,
) -> NewAgreement {
    NewAgreement {
        client_id: 7,
        agreement_date,
        pricing: Pricing {
            networking_charge: total,
            ..Default::default()
        },
        payment_frequency,
        payment_mode: PaymentMode::BankTransfer,
        notes: None,
    }
}

pub async fn insert_category(
    db: &DatabaseConnection,
    name: &str,
    category_type: EntryType,
) -> account_category::Model {
    account_category::ActiveModel {
        name: Set(name.to_string()),
        category_type: Set(category_type),
        description: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}
