//! Installment lifecycle: payments, reminders and the collections dashboards.
//!
//! `pending -> paid` is the only transition and [`record_payment`] is the only way to make it.
//! The flip is a conditional update on `status = 'pending'`, so of two concurrent payments for
//! the same installment exactly one succeeds.

use chrono::{Datelike, NaiveDate};
use model::entities::account_category::{self, EntryType};
use model::entities::account_transaction::{self, TransactionStatus};
use model::entities::agreement::{self, AgreementStatus, PaymentMode};
use model::entities::installment::{self, InstallmentStatus};
use model::entities::payment_record;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, QueryTrait, Set, TransactionTrait,
};
use tracing::{debug, info, instrument, trace, warn};

use crate::buckets::{self, Bucket};
use crate::error::{ComputeError, Result, StateConflict, ValidationError};
use crate::money::Money;
use crate::period::{add_days, month_bounds};
use crate::schedule::REMINDER_LEAD_DAYS;

/// Books the collected amount as an approved income transaction alongside the receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerMirror {
    pub category_id: i32,
    /// Stamped as both creator and approver.
    pub actor: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentInput {
    pub amount_paid: i64,
    pub payment_date: NaiveDate,
    pub payment_method: PaymentMode,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
    pub recorded_by: Option<String>,
    pub mirror: Option<LedgerMirror>,
}

impl PaymentInput {
    pub fn cash(amount_paid: i64, payment_date: NaiveDate) -> Self {
        Self {
            amount_paid,
            payment_date,
            payment_method: PaymentMode::Cash,
            reference_number: None,
            notes: None,
            recorded_by: None,
            mirror: None,
        }
    }
}

/// Everything a successful payment wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentOutcome {
    pub installment: installment::Model,
    pub payment: payment_record::Model,
    /// True when this payment settled the last pending installment.
    pub agreement_completed: bool,
    pub ledger_entry: Option<account_transaction::Model>,
}

/// Records money received for an installment and marks it paid.
///
/// `amount_paid` is stored as received even when it differs from the scheduled amount.
/// Fails with `AlreadyPaid` when the installment is not pending; in that case the existing
/// receipt is left untouched.
#[instrument(skip(db, input), fields(amount_paid = input.amount_paid))]
pub async fn record_payment(
    db: &DatabaseConnection,
    installment_id: i32,
    input: PaymentInput,
) -> Result<PaymentOutcome> {
    trace!("Entering record_payment for installment_id: {}", installment_id);
    Money::non_negative("amount_paid", input.amount_paid)?;

    let txn = db.begin().await?;

    let current = installment::Entity::find_by_id(installment_id)
        .one(&txn)
        .await?
        .ok_or_else(|| ComputeError::not_found("Installment", installment_id))?;
    if current.status == InstallmentStatus::Paid {
        warn!("Installment {} is already paid", installment_id);
        return Err(StateConflict::AlreadyPaid { installment_id }.into());
    }

    let agreement = agreement::Entity::find_by_id(current.agreement_id)
        .one(&txn)
        .await?
        .ok_or_else(|| ComputeError::not_found("Agreement", current.agreement_id))?;
    if agreement.status == AgreementStatus::Cancelled {
        return Err(StateConflict::AgreementNotActive {
            agreement_id: agreement.id,
            status: agreement.status.to_value(),
        }
        .into());
    }

    if let Some(mirror) = &input.mirror {
        let category = account_category::Entity::find_by_id(mirror.category_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ComputeError::not_found("AccountCategory", mirror.category_id))?;
        if category.category_type != EntryType::Income {
            return Err(ValidationError::CategoryTypeMismatch {
                category_id: category.id,
                category_type: category.category_type.to_value(),
                transaction_type: EntryType::Income.to_value(),
            }
            .into());
        }
    }

    // The agreement row is taken before the installment, the same order a schedule edit uses.
    // The bump also makes any edit that read the agreement earlier fail its version check.
    let bumped = agreement::Entity::update_many()
        .col_expr(
            agreement::Column::Version,
            Expr::col(agreement::Column::Version).add(1),
        )
        .filter(agreement::Column::Id.eq(agreement.id))
        .filter(agreement::Column::Status.ne(AgreementStatus::Cancelled))
        .exec(&txn)
        .await?;
    if bumped.rows_affected != 1 {
        warn!("Agreement {} was cancelled concurrently", agreement.id);
        return Err(StateConflict::AgreementNotActive {
            agreement_id: agreement.id,
            status: AgreementStatus::Cancelled.to_value(),
        }
        .into());
    }

    let flipped = installment::Entity::update_many()
        .set(installment::ActiveModel {
            status: Set(InstallmentStatus::Paid),
            ..Default::default()
        })
        .filter(installment::Column::Id.eq(installment_id))
        .filter(installment::Column::Status.eq(InstallmentStatus::Pending))
        .exec(&txn)
        .await?;
    if flipped.rows_affected != 1 {
        // Either paid by a concurrent payment or removed by a concurrent schedule rewrite.
        let reread = installment::Entity::find_by_id(installment_id).one(&txn).await?;
        return Err(match reread {
            Some(_) => {
                warn!("Installment {} was paid concurrently", installment_id);
                StateConflict::AlreadyPaid { installment_id }.into()
            }
            None => {
                warn!("Installment {} was replaced by a schedule edit", installment_id);
                StateConflict::ConcurrentModification {
                    entity: "Installment",
                    id: installment_id,
                }
                .into()
            }
        });
    }

    let payment = payment_record::ActiveModel {
        installment_id: Set(installment_id),
        agreement_id: Set(agreement.id),
        payment_date: Set(input.payment_date),
        amount_paid: Set(input.amount_paid),
        payment_method: Set(input.payment_method),
        reference_number: Set(input.reference_number.clone()),
        notes: Set(input.notes),
        recorded_by: Set(input.recorded_by),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let still_pending = installment::Entity::find()
        .filter(installment::Column::AgreementId.eq(agreement.id))
        .filter(installment::Column::Status.eq(InstallmentStatus::Pending))
        .count(&txn)
        .await?;
    let agreement_completed = still_pending == 0 && agreement.status == AgreementStatus::Active;
    if agreement_completed {
        agreement::Entity::update_many()
            .set(agreement::ActiveModel {
                status: Set(AgreementStatus::Completed),
                ..Default::default()
            })
            .filter(agreement::Column::Id.eq(agreement.id))
            .exec(&txn)
            .await?;
        info!("Agreement {} is fully collected", agreement.id);
    }

    let ledger_entry = match input.mirror {
        Some(mirror) => Some(
            account_transaction::ActiveModel {
                transaction_date: Set(input.payment_date),
                transaction_type: Set(EntryType::Income),
                category_id: Set(mirror.category_id),
                amount: Set(input.amount_paid),
                payment_method: Set(input.payment_method),
                reference_number: Set(input.reference_number),
                description: Set(Some(format!(
                    "Installment {} of agreement {}",
                    current.payment_number, agreement.id
                ))),
                installment_id: Set(Some(installment_id)),
                status: Set(TransactionStatus::Approved),
                created_by: Set(mirror.actor.clone()),
                approved_by: Set(Some(mirror.actor)),
                ..Default::default()
            }
            .insert(&txn)
            .await?,
        ),
        None => None,
    };

    let installment = installment::Entity::find_by_id(installment_id)
        .one(&txn)
        .await?
        .ok_or_else(|| ComputeError::not_found("Installment", installment_id))?;
    txn.commit().await?;

    info!(
        "Recorded payment {} of {} for installment {} (scheduled {})",
        payment.id, payment.amount_paid, installment_id, installment.amount
    );
    Ok(PaymentOutcome {
        installment,
        payment,
        agreement_completed,
        ledger_entry,
    })
}

/// Sets the reminder flag of a pending installment. Calling it again is a no-op.
#[instrument(skip(db))]
pub async fn mark_reminder_sent(
    db: &DatabaseConnection,
    installment_id: i32,
) -> Result<installment::Model> {
    let current = installment::Entity::find_by_id(installment_id)
        .one(db)
        .await?
        .ok_or_else(|| ComputeError::not_found("Installment", installment_id))?;

    if current.status == InstallmentStatus::Paid {
        return Err(StateConflict::AlreadyPaid { installment_id }.into());
    }
    if current.reminder_sent {
        debug!("Reminder for installment {} already marked", installment_id);
        return Ok(current);
    }

    let updated = installment::Entity::update_many()
        .set(installment::ActiveModel {
            reminder_sent: Set(true),
            ..Default::default()
        })
        .filter(installment::Column::Id.eq(installment_id))
        .filter(installment::Column::Status.eq(InstallmentStatus::Pending))
        .exec(db)
        .await?;
    if updated.rows_affected != 1 {
        return Err(StateConflict::AlreadyPaid { installment_id }.into());
    }

    info!("Marked reminder sent for installment {}", installment_id);
    Ok(installment::Model {
        reminder_sent: true,
        ..current
    })
}

pub async fn installments_for_agreement(
    db: &DatabaseConnection,
    agreement_id: i32,
) -> Result<Vec<installment::Model>> {
    if agreement::Entity::find_by_id(agreement_id).one(db).await?.is_none() {
        return Err(ComputeError::not_found("Agreement", agreement_id));
    }
    Ok(installment::Entity::find()
        .filter(installment::Column::AgreementId.eq(agreement_id))
        .order_by_asc(installment::Column::PaymentNumber)
        .all(db)
        .await?)
}

/// Pending installments in `bucket` as of `today`, optionally for a single agreement,
/// ordered by due date.
#[instrument(skip(db))]
pub async fn installments_in_bucket(
    db: &DatabaseConnection,
    bucket: Bucket,
    today: NaiveDate,
    agreement_id: Option<i32>,
) -> Result<Vec<installment::Model>> {
    // A cancelled agreement keeps its pending rows for history but nothing is collectible.
    let mut query = installment::Entity::find()
        .filter(installment::Column::Status.eq(InstallmentStatus::Pending))
        .filter(
            installment::Column::AgreementId.in_subquery(
                agreement::Entity::find()
                    .select_only()
                    .column(agreement::Column::Id)
                    .filter(agreement::Column::Status.ne(AgreementStatus::Cancelled))
                    .into_query(),
            ),
        );

    // Narrow in the store, then apply the exact rules in memory.
    query = match bucket {
        Bucket::Overdue => query.filter(installment::Column::DueDate.lt(today)),
        Bucket::Upcoming => {
            let horizon = add_days(today, REMINDER_LEAD_DAYS).unwrap_or(NaiveDate::MAX);
            query.filter(installment::Column::DueDate.between(today, horizon))
        }
        Bucket::ThisMonth => {
            let (start, end) = month_bounds(today.year(), today.month())?;
            query.filter(installment::Column::DueDate.between(start, end))
        }
    };
    if let Some(agreement_id) = agreement_id {
        query = query.filter(installment::Column::AgreementId.eq(agreement_id));
    }

    let candidates = query.all(db).await?;
    let selected = buckets::classify(candidates, bucket, today);
    debug!(
        "{} installment(s) in bucket {} as of {}",
        selected.len(),
        bucket.as_str(),
        today
    );
    Ok(selected)
}

/// Upcoming installments whose reminder has not been sent yet.
pub async fn reminders_due(
    db: &DatabaseConnection,
    today: NaiveDate,
) -> Result<Vec<installment::Model>> {
    let upcoming = installments_in_bucket(db, Bucket::Upcoming, today, None).await?;
    Ok(upcoming.into_iter().filter(|i| !i.reminder_sent).collect())
}

pub async fn payments_for_installment(
    db: &DatabaseConnection,
    installment_id: i32,
) -> Result<Vec<payment_record::Model>> {
    if installment::Entity::find_by_id(installment_id)
        .one(db)
        .await?
        .is_none()
    {
        return Err(ComputeError::not_found("Installment", installment_id));
    }
    Ok(payment_record::Entity::find()
        .filter(payment_record::Column::InstallmentId.eq(installment_id))
        .order_by_asc(payment_record::Column::PaymentDate)
        .all(db)
        .await?)
}

pub async fn payments_for_agreement(
    db: &DatabaseConnection,
    agreement_id: i32,
) -> Result<Vec<payment_record::Model>> {
    if agreement::Entity::find_by_id(agreement_id).one(db).await?.is_none() {
        return Err(ComputeError::not_found("Agreement", agreement_id));
    }
    Ok(payment_record::Entity::find()
        .filter(payment_record::Column::AgreementId.eq(agreement_id))
        .order_by_asc(payment_record::Column::PaymentDate)
        .order_by_asc(payment_record::Column::Id)
        .all(db)
        .await?)
}
