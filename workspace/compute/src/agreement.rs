//! Agreement pricing and lifecycle, including schedule (re)generation.
//!
//! Regeneration policy: a change to any schedule input (total cost, frequency or agreement date)
//! replaces the whole schedule, and is refused with `ScheduleLocked` once any installment has
//! been paid. Collected history is never rewritten; adjustments after a payment go through the
//! ledger instead.

use chrono::{NaiveDate, Utc};
use model::entities::agreement::{self, AgreementStatus, PaymentFrequency, PaymentMode};
use model::entities::installment::{self, InstallmentStatus};
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{ComputeError, Result, StateConflict, ValidationError};
use crate::money::Money;
use crate::schedule::{self, ScheduledInstallment};

/// Count and unit rate of one equipment category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EquipmentLine {
    pub count: i32,
    pub rate: i64,
}

impl EquipmentLine {
    pub fn new(count: i32, rate: i64) -> Self {
        Self { count, rate }
    }

    fn amount(&self) -> Option<Money> {
        Money::from_minor(self.rate).checked_mul(i64::from(self.count))
    }
}

/// Itemized price of an agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pricing {
    pub desktops: EquipmentLine,
    pub laptops: EquipmentLine,
    pub printers: EquipmentLine,
    pub servers: EquipmentLine,
    pub scanners: EquipmentLine,
    pub networking_charge: i64,
    pub discount: i64,
}

impl Pricing {
    pub fn from_model(model: &agreement::Model) -> Self {
        Self {
            desktops: EquipmentLine::new(model.desktop_count, model.desktop_rate),
            laptops: EquipmentLine::new(model.laptop_count, model.laptop_rate),
            printers: EquipmentLine::new(model.printer_count, model.printer_rate),
            servers: EquipmentLine::new(model.server_count, model.server_rate),
            scanners: EquipmentLine::new(model.scanner_count, model.scanner_rate),
            networking_charge: model.networking_charge,
            discount: model.discount,
        }
    }

    fn lines(&self) -> [(&'static str, &'static str, EquipmentLine); 5] {
        [
            ("desktop_count", "desktop_rate", self.desktops),
            ("laptop_count", "laptop_rate", self.laptops),
            ("printer_count", "printer_rate", self.printers),
            ("server_count", "server_rate", self.servers),
            ("scanner_count", "scanner_rate", self.scanners),
        ]
    }

    /// Every count, rate, charge and the discount must be non-negative.
    pub fn validate(&self) -> Result<()> {
        for (count_field, rate_field, line) in self.lines() {
            Money::non_negative(count_field, i64::from(line.count))?;
            Money::non_negative(rate_field, line.rate)?;
        }
        Money::non_negative("networking_charge", self.networking_charge)?;
        Money::non_negative("discount", self.discount)?;
        Ok(())
    }

    /// Sum of `count * rate` over all categories plus the flat networking charge.
    pub fn subtotal(&self) -> Result<Money> {
        let mut subtotal = Money::from_minor(self.networking_charge);
        for (_, _, line) in self.lines() {
            let amount = line
                .amount()
                .ok_or(ValidationError::AmountOverflow("line item amount"))?;
            subtotal = subtotal.try_add(amount, "subtotal")?;
        }
        Ok(subtotal)
    }

    /// `subtotal - discount`, clamped at zero.
    pub fn total_cost(&self) -> Result<Money> {
        let total = self
            .subtotal()?
            .try_sub(Money::from_minor(self.discount), "total cost")?;
        Ok(total.max(Money::ZERO))
    }

    fn write_to(&self, active: &mut agreement::ActiveModel) -> Result<()> {
        active.desktop_count = Set(self.desktops.count);
        active.desktop_rate = Set(self.desktops.rate);
        active.laptop_count = Set(self.laptops.count);
        active.laptop_rate = Set(self.laptops.rate);
        active.printer_count = Set(self.printers.count);
        active.printer_rate = Set(self.printers.rate);
        active.server_count = Set(self.servers.count);
        active.server_rate = Set(self.servers.rate);
        active.scanner_count = Set(self.scanners.count);
        active.scanner_rate = Set(self.scanners.rate);
        active.networking_charge = Set(self.networking_charge);
        active.discount = Set(self.discount);
        active.subtotal = Set(self.subtotal()?.minor());
        active.total_cost = Set(self.total_cost()?.minor());
        Ok(())
    }
}

/// Field-by-field change to a [`Pricing`]; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PricingPatch {
    pub desktop_count: Option<i32>,
    pub desktop_rate: Option<i64>,
    pub laptop_count: Option<i32>,
    pub laptop_rate: Option<i64>,
    pub printer_count: Option<i32>,
    pub printer_rate: Option<i64>,
    pub server_count: Option<i32>,
    pub server_rate: Option<i64>,
    pub scanner_count: Option<i32>,
    pub scanner_rate: Option<i64>,
    pub networking_charge: Option<i64>,
    pub discount: Option<i64>,
}

impl PricingPatch {
    pub fn apply(&self, base: Pricing) -> Pricing {
        Pricing {
            desktops: EquipmentLine::new(
                self.desktop_count.unwrap_or(base.desktops.count),
                self.desktop_rate.unwrap_or(base.desktops.rate),
            ),
            laptops: EquipmentLine::new(
                self.laptop_count.unwrap_or(base.laptops.count),
                self.laptop_rate.unwrap_or(base.laptops.rate),
            ),
            printers: EquipmentLine::new(
                self.printer_count.unwrap_or(base.printers.count),
                self.printer_rate.unwrap_or(base.printers.rate),
            ),
            servers: EquipmentLine::new(
                self.server_count.unwrap_or(base.servers.count),
                self.server_rate.unwrap_or(base.servers.rate),
            ),
            scanners: EquipmentLine::new(
                self.scanner_count.unwrap_or(base.scanners.count),
                self.scanner_rate.unwrap_or(base.scanners.rate),
            ),
            networking_charge: self.networking_charge.unwrap_or(base.networking_charge),
            discount: self.discount.unwrap_or(base.discount),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAgreement {
    pub client_id: i32,
    pub agreement_date: NaiveDate,
    pub pricing: Pricing,
    pub payment_frequency: PaymentFrequency,
    pub payment_mode: PaymentMode,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgreementPatch {
    pub agreement_date: Option<NaiveDate>,
    pub pricing: PricingPatch,
    pub payment_frequency: Option<PaymentFrequency>,
    pub payment_mode: Option<PaymentMode>,
    pub notes: Option<String>,
}

/// An agreement together with its current schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgreementWithSchedule {
    pub agreement: agreement::Model,
    pub installments: Vec<installment::Model>,
    /// True when the call replaced the schedule.
    pub regenerated: bool,
}

fn installment_rows(
    agreement_id: i32,
    schedule: &[ScheduledInstallment],
) -> Vec<installment::ActiveModel> {
    schedule
        .iter()
        .map(|row| installment::ActiveModel {
            agreement_id: Set(agreement_id),
            payment_number: Set(row.payment_number),
            due_date: Set(row.due_date),
            amount: Set(row.amount.minor()),
            status: Set(InstallmentStatus::Pending),
            reminder_sent: Set(false),
            ..Default::default()
        })
        .collect()
}

async fn load_schedule(
    txn: &DatabaseTransaction,
    agreement_id: i32,
) -> Result<Vec<installment::Model>> {
    Ok(installment::Entity::find()
        .filter(installment::Column::AgreementId.eq(agreement_id))
        .order_by_asc(installment::Column::PaymentNumber)
        .all(txn)
        .await?)
}

/// Creates an agreement and its installment schedule in one store transaction.
#[instrument(skip(db, new_agreement), fields(client_id = new_agreement.client_id))]
pub async fn create_agreement(
    db: &DatabaseConnection,
    new_agreement: NewAgreement,
) -> Result<AgreementWithSchedule> {
    trace!("Entering create_agreement");
    new_agreement.pricing.validate()?;
    let total = new_agreement.pricing.total_cost()?;
    let schedule = schedule::generate(
        total,
        new_agreement.agreement_date,
        new_agreement.payment_frequency,
    )?;

    let mut active = agreement::ActiveModel {
        client_id: Set(new_agreement.client_id),
        agreement_date: Set(new_agreement.agreement_date),
        payment_frequency: Set(new_agreement.payment_frequency),
        payment_mode: Set(new_agreement.payment_mode),
        status: Set(AgreementStatus::Active),
        notes: Set(new_agreement.notes),
        version: Set(0),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };
    new_agreement.pricing.write_to(&mut active)?;

    let txn = db.begin().await?;
    let agreement = active.insert(&txn).await?;
    installment::Entity::insert_many(installment_rows(agreement.id, &schedule))
        .exec(&txn)
        .await?;
    let installments = load_schedule(&txn, agreement.id).await?;
    txn.commit().await?;

    info!(
        "Created agreement {} for client {} with total {} in {} installments",
        agreement.id,
        agreement.client_id,
        agreement.total_cost,
        installments.len()
    );
    Ok(AgreementWithSchedule {
        agreement,
        installments,
        regenerated: true,
    })
}

/// Applies `patch` to an active agreement.
///
/// If the total cost, frequency or agreement date changes, the schedule is regenerated from
/// scratch, unless an installment is already paid, in which case nothing is written and
/// `ScheduleLocked` is returned.
#[instrument(skip(db, patch))]
pub async fn update_agreement(
    db: &DatabaseConnection,
    agreement_id: i32,
    patch: AgreementPatch,
) -> Result<AgreementWithSchedule> {
    trace!("Entering update_agreement for agreement_id: {}", agreement_id);
    let txn = db.begin().await?;

    let existing = agreement::Entity::find_by_id(agreement_id)
        .one(&txn)
        .await?
        .ok_or_else(|| ComputeError::not_found("Agreement", agreement_id))?;

    if existing.status != AgreementStatus::Active {
        warn!(
            "Refusing to edit agreement {} in status {:?}",
            agreement_id, existing.status
        );
        return Err(StateConflict::AgreementNotActive {
            agreement_id,
            status: existing.status.to_value(),
        }
        .into());
    }

    let pricing = patch.pricing.apply(Pricing::from_model(&existing));
    pricing.validate()?;
    let total = pricing.total_cost()?;
    let agreement_date = patch.agreement_date.unwrap_or(existing.agreement_date);
    let frequency = patch.payment_frequency.unwrap_or(existing.payment_frequency);

    let schedule_changed = total.minor() != existing.total_cost
        || frequency != existing.payment_frequency
        || agreement_date != existing.agreement_date;

    let mut active = agreement::ActiveModel {
        agreement_date: Set(agreement_date),
        payment_frequency: Set(frequency),
        version: Set(existing.version + 1),
        ..Default::default()
    };
    pricing.write_to(&mut active)?;
    if let Some(mode) = patch.payment_mode {
        active.payment_mode = Set(mode);
    }
    if let Some(notes) = patch.notes {
        active.notes = Set(Some(notes));
    }

    // The version check runs before any installment is touched. A payment bumps the same row
    // first, so the two serialize on the agreement and the loser sees the new version.
    let updated = agreement::Entity::update_many()
        .set(active)
        .filter(agreement::Column::Id.eq(agreement_id))
        .filter(agreement::Column::Version.eq(existing.version))
        .exec(&txn)
        .await?;
    if updated.rows_affected != 1 {
        warn!("Agreement {} changed while it was being edited", agreement_id);
        return Err(StateConflict::ConcurrentModification {
            entity: "Agreement",
            id: agreement_id,
        }
        .into());
    }

    if schedule_changed {
        let paid_installments = installment::Entity::find()
            .filter(installment::Column::AgreementId.eq(agreement_id))
            .filter(installment::Column::Status.eq(InstallmentStatus::Paid))
            .count(&txn)
            .await?;
        if paid_installments > 0 {
            warn!(
                "Schedule of agreement {} is locked by {} paid installment(s)",
                agreement_id, paid_installments
            );
            return Err(StateConflict::ScheduleLocked {
                agreement_id,
                paid_installments,
            }
            .into());
        }

        let schedule = schedule::generate(total, agreement_date, frequency)?;
        let removed = installment::Entity::delete_many()
            .filter(installment::Column::AgreementId.eq(agreement_id))
            .exec(&txn)
            .await?;
        installment::Entity::insert_many(installment_rows(agreement_id, &schedule))
            .exec(&txn)
            .await?;
        debug!(
            "Replaced {} pending installments of agreement {} with {}",
            removed.rows_affected,
            agreement_id,
            schedule.len()
        );
    }

    let agreement = agreement::Entity::find_by_id(agreement_id)
        .one(&txn)
        .await?
        .ok_or_else(|| ComputeError::not_found("Agreement", agreement_id))?;
    let installments = load_schedule(&txn, agreement_id).await?;
    txn.commit().await?;

    info!(
        "Updated agreement {} (total {}, schedule regenerated: {})",
        agreement_id, agreement.total_cost, schedule_changed
    );
    Ok(AgreementWithSchedule {
        agreement,
        installments,
        regenerated: schedule_changed,
    })
}

/// Moves an active agreement to `cancelled`. The schedule and receipts stay as they are.
#[instrument(skip(db))]
pub async fn cancel_agreement(
    db: &DatabaseConnection,
    agreement_id: i32,
) -> Result<agreement::Model> {
    let txn = db.begin().await?;
    let existing = agreement::Entity::find_by_id(agreement_id)
        .one(&txn)
        .await?
        .ok_or_else(|| ComputeError::not_found("Agreement", agreement_id))?;

    if existing.status != AgreementStatus::Active {
        return Err(StateConflict::AgreementNotActive {
            agreement_id,
            status: existing.status.to_value(),
        }
        .into());
    }

    let version = existing.version;
    let mut active: agreement::ActiveModel = existing.into();
    active.status = Set(AgreementStatus::Cancelled);
    active.version = Set(version + 1);
    let cancelled = active.update(&txn).await?;
    txn.commit().await?;

    info!("Cancelled agreement {}", agreement_id);
    Ok(cancelled)
}

pub async fn get_agreement(
    db: &DatabaseConnection,
    agreement_id: i32,
) -> Result<agreement::Model> {
    agreement::Entity::find_by_id(agreement_id)
        .one(db)
        .await?
        .ok_or_else(|| ComputeError::not_found("Agreement", agreement_id))
}

pub async fn list_agreements(
    db: &DatabaseConnection,
    status: Option<AgreementStatus>,
    client_id: Option<i32>,
) -> Result<Vec<agreement::Model>> {
    let mut query = agreement::Entity::find();
    if let Some(status) = status {
        query = query.filter(agreement::Column::Status.eq(status));
    }
    if let Some(client_id) = client_id {
        query = query.filter(agreement::Column::ClientId.eq(client_id));
    }
    Ok(query
        .order_by_desc(agreement::Column::AgreementDate)
        .all(db)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::{PaymentInput, record_payment};
    use crate::testing::{date, monthly_agreement, setup_db};

    fn pricing(desktops: i32, rate: i64, discount: i64) -> Pricing {
        Pricing {
            desktops: EquipmentLine::new(desktops, rate),
            discount,
            ..Default::default()
        }
    }

    #[test]
    fn test_subtotal_and_total() {
        let pricing = Pricing {
            desktops: EquipmentLine::new(4, 2_500_00),
            laptops: EquipmentLine::new(2, 3_000_00),
            printers: EquipmentLine::new(1, 1_200_00),
            servers: EquipmentLine::new(1, 10_000_00),
            scanners: EquipmentLine::new(0, 900_00),
            networking_charge: 5_000_00,
            discount: 1_000_00,
        };
        assert_eq!(pricing.subtotal().unwrap().minor(), 3_220_000);
        assert_eq!(pricing.total_cost().unwrap().minor(), 3_120_000);
    }

    #[test]
    fn test_total_is_clamped_at_zero() {
        let pricing = pricing(1, 1_000, 5_000);
        assert_eq!(pricing.subtotal().unwrap().minor(), 1_000);
        assert_eq!(pricing.total_cost().unwrap(), Money::ZERO);
    }

    #[test]
    fn test_negative_line_items_are_rejected() {
        let err = pricing(-1, 1_000, 0).validate().unwrap_err();
        assert!(matches!(
            err,
            ComputeError::Validation(ValidationError::NegativeAmount {
                field: "desktop_count",
                value: -1
            })
        ));

        let err = pricing(1, 1_000, -1).validate().unwrap_err();
        assert!(matches!(
            err,
            ComputeError::Validation(ValidationError::NegativeAmount { field: "discount", .. })
        ));
    }

    #[test]
    fn test_line_overflow_is_reported() {
        let pricing = pricing(i32::MAX, i64::MAX, 0);
        assert!(matches!(
            pricing.subtotal(),
            Err(ComputeError::Validation(ValidationError::AmountOverflow(_)))
        ));
    }

    #[test]
    fn test_pricing_patch_keeps_unset_fields() {
        let base = pricing(2, 1_000, 100);
        let patch = PricingPatch {
            discount: Some(0),
            printer_count: Some(3),
            printer_rate: Some(500),
            ..Default::default()
        };
        let merged = patch.apply(base);
        assert_eq!(merged.desktops, EquipmentLine::new(2, 1_000));
        assert_eq!(merged.printers, EquipmentLine::new(3, 500));
        assert_eq!(merged.discount, 0);
    }

    #[tokio::test]
    async fn test_create_agreement_generates_schedule() {
        let db = setup_db().await;
        let created = create_agreement(&db, monthly_agreement(120_000, date(2024, 1, 15)))
            .await
            .unwrap();

        assert_eq!(created.agreement.total_cost, 120_000);
        assert_eq!(created.agreement.status, AgreementStatus::Active);
        assert_eq!(created.installments.len(), 12);
        let sum: i64 = created.installments.iter().map(|i| i.amount).sum();
        assert_eq!(sum, 120_000);
        assert!(
            created
                .installments
                .iter()
                .all(|i| i.status == InstallmentStatus::Pending && !i.reminder_sent)
        );
        assert_eq!(created.installments[11].due_date, date(2024, 12, 15));
    }

    #[tokio::test]
    async fn test_update_regenerates_unpaid_schedule() {
        let db = setup_db().await;
        let created = create_agreement(&db, monthly_agreement(120_000, date(2024, 1, 15)))
            .await
            .unwrap();

        let patch = AgreementPatch {
            payment_frequency: Some(PaymentFrequency::ThreeTimes),
            pricing: PricingPatch {
                discount: Some(20_000),
                ..Default::default()
            },
            ..Default::default()
        };
        let updated = update_agreement(&db, created.agreement.id, patch).await.unwrap();

        assert!(updated.regenerated);
        assert_eq!(updated.agreement.total_cost, 100_000);
        assert_eq!(updated.agreement.version, created.agreement.version + 1);
        let amounts: Vec<i64> = updated.installments.iter().map(|i| i.amount).collect();
        assert_eq!(amounts, vec![33_334, 33_333, 33_333]);
        let numbers: Vec<i32> = updated.installments.iter().map(|i| i.payment_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_update_of_informational_fields_keeps_schedule() {
        let db = setup_db().await;
        let created = create_agreement(&db, monthly_agreement(120_000, date(2024, 1, 15)))
            .await
            .unwrap();

        let patch = AgreementPatch {
            payment_mode: Some(PaymentMode::Cheque),
            notes: Some("Client prefers cheques".to_string()),
            ..Default::default()
        };
        let updated = update_agreement(&db, created.agreement.id, patch).await.unwrap();

        assert!(!updated.regenerated);
        assert_eq!(updated.agreement.payment_mode, PaymentMode::Cheque);
        let before: Vec<i32> = created.installments.iter().map(|i| i.id).collect();
        let after: Vec<i32> = updated.installments.iter().map(|i| i.id).collect();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_update_after_payment_is_schedule_locked() {
        let db = setup_db().await;
        let created = create_agreement(&db, monthly_agreement(120_000, date(2024, 1, 15)))
            .await
            .unwrap();
        let first = created.installments[0].id;
        record_payment(&db, first, PaymentInput::cash(10_000, date(2024, 1, 15)))
            .await
            .unwrap();

        let patch = AgreementPatch {
            pricing: PricingPatch {
                discount: Some(12_000),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = update_agreement(&db, created.agreement.id, patch)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ComputeError::Conflict(StateConflict::ScheduleLocked {
                paid_installments: 1,
                ..
            })
        ));

        // Nothing changed.
        let agreement = get_agreement(&db, created.agreement.id).await.unwrap();
        assert_eq!(agreement.total_cost, 120_000);
        assert_eq!(agreement.discount, 0);
        // The version bump from the refused edit is rolled back; only the payment counts.
        assert_eq!(agreement.version, created.agreement.version + 1);
        let schedule = crate::collections::installments_for_agreement(&db, agreement.id)
            .await
            .unwrap();
        assert_eq!(schedule.len(), 12);
        assert_eq!(schedule[0].status, InstallmentStatus::Paid);
    }

    #[tokio::test]
    async fn test_cancelled_agreement_cannot_be_edited() {
        let db = setup_db().await;
        let created = create_agreement(&db, monthly_agreement(120_000, date(2024, 1, 15)))
            .await
            .unwrap();
        let cancelled = cancel_agreement(&db, created.agreement.id).await.unwrap();
        assert_eq!(cancelled.status, AgreementStatus::Cancelled);

        let err = update_agreement(&db, created.agreement.id, AgreementPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ComputeError::Conflict(StateConflict::AgreementNotActive { .. })
        ));

        let err = cancel_agreement(&db, created.agreement.id).await.unwrap_err();
        assert_eq!(err.code(), "AGREEMENT_NOT_ACTIVE");
    }

    #[tokio::test]
    async fn test_unknown_agreement() {
        let db = setup_db().await;
        let err = get_agreement(&db, 404).await.unwrap_err();
        assert!(matches!(
            err,
            ComputeError::NotFound {
                entity: "Agreement",
                id: 404
            }
        ));
    }
}
