//! Account categories and the append-and-approve transaction ledger.
//!
//! New entries are always `pending`. A pending entry may be edited, approved or rejected;
//! approved and rejected are final. Status changes are conditional on `status = 'pending'`
//! so two concurrent decisions cannot both win.

use chrono::NaiveDate;
use model::entities::account_category::{self, EntryType};
use model::entities::account_transaction::{self, TransactionStatus};
use model::entities::agreement::PaymentMode;
use model::entities::installment;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{ComputeError, Result, StateConflict, ValidationError};
use crate::money::Money;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub name: String,
    pub category_type: EntryType,
    pub description: Option<String>,
}

/// Creates a category. Names are unique ignoring ASCII case.
#[instrument(skip(db, category), fields(name = %category.name))]
pub async fn create_category(
    db: &DatabaseConnection,
    category: NewCategory,
) -> Result<account_category::Model> {
    let name = category.name.trim().to_string();
    // The unique index only covers exact spelling, so the case-insensitive check and the
    // insert share one transaction.
    let txn = db.begin().await?;
    if account_category::Model::find_by_name(&txn, &name)
        .await?
        .is_some()
    {
        return Err(StateConflict::DuplicateCategory { name }.into());
    }

    let created = account_category::ActiveModel {
        name: Set(name),
        category_type: Set(category.category_type),
        description: Set(category.description),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;
    info!("Created category {} ({})", created.name, created.id);
    Ok(created)
}

pub async fn list_categories(
    db: &DatabaseConnection,
    category_type: Option<EntryType>,
) -> Result<Vec<account_category::Model>> {
    let mut query = account_category::Entity::find();
    if let Some(category_type) = category_type {
        query = query.filter(account_category::Column::CategoryType.eq(category_type));
    }
    Ok(query
        .order_by_asc(account_category::Column::Name)
        .all(db)
        .await?)
}

pub async fn get_category(
    db: &DatabaseConnection,
    category_id: i32,
) -> Result<account_category::Model> {
    account_category::Entity::find_by_id(category_id)
        .one(db)
        .await?
        .ok_or_else(|| ComputeError::not_found("AccountCategory", category_id))
}

/// Fields supplied by the caller when booking a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub transaction_date: NaiveDate,
    pub transaction_type: EntryType,
    pub category_id: i32,
    pub amount: i64,
    pub payment_method: PaymentMode,
    pub vendor_customer: Option<String>,
    pub invoice_number: Option<String>,
    pub receipt_number: Option<String>,
    pub reference_number: Option<String>,
    pub description: Option<String>,
    pub installment_id: Option<i32>,
    pub service_ticket_id: Option<i32>,
}

impl NewTransaction {
    pub fn new(
        transaction_date: NaiveDate,
        transaction_type: EntryType,
        category_id: i32,
        amount: i64,
    ) -> Self {
        Self {
            transaction_date,
            transaction_type,
            category_id,
            amount,
            payment_method: PaymentMode::Cash,
            vendor_customer: None,
            invoice_number: None,
            receipt_number: None,
            reference_number: None,
            description: None,
            installment_id: None,
            service_ticket_id: None,
        }
    }
}

/// Changes to a pending transaction; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionPatch {
    pub transaction_date: Option<NaiveDate>,
    pub transaction_type: Option<EntryType>,
    pub category_id: Option<i32>,
    pub amount: Option<i64>,
    pub payment_method: Option<PaymentMode>,
    pub vendor_customer: Option<String>,
    pub invoice_number: Option<String>,
    pub receipt_number: Option<String>,
    pub reference_number: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    pub status: Option<TransactionStatus>,
    pub transaction_type: Option<EntryType>,
    pub category_id: Option<i32>,
    /// Inclusive.
    pub from: Option<NaiveDate>,
    /// Inclusive.
    pub to: Option<NaiveDate>,
}

/// The transaction type must equal the type of its category.
async fn ensure_category_accepts<C: ConnectionTrait>(
    conn: &C,
    category_id: i32,
    transaction_type: EntryType,
) -> Result<()> {
    let category = account_category::Entity::find_by_id(category_id)
        .one(conn)
        .await?
        .ok_or_else(|| ComputeError::not_found("AccountCategory", category_id))?;

    if category.category_type != transaction_type {
        warn!(
            "Category {} is {:?}, refusing a {:?} transaction",
            category_id, category.category_type, transaction_type
        );
        return Err(ValidationError::CategoryTypeMismatch {
            category_id,
            category_type: category.category_type.to_value(),
            transaction_type: transaction_type.to_value(),
        }
        .into());
    }
    Ok(())
}

/// Books a new transaction as `pending`, stamped with the creating actor.
#[instrument(skip(db, transaction), fields(category_id = transaction.category_id, amount = transaction.amount))]
pub async fn create_transaction(
    db: &DatabaseConnection,
    transaction: NewTransaction,
    actor: &str,
) -> Result<account_transaction::Model> {
    trace!("Entering create_transaction");
    Money::non_negative("amount", transaction.amount)?;
    ensure_category_accepts(db, transaction.category_id, transaction.transaction_type).await?;

    if let Some(installment_id) = transaction.installment_id {
        if installment::Entity::find_by_id(installment_id)
            .one(db)
            .await?
            .is_none()
        {
            return Err(ComputeError::not_found("Installment", installment_id));
        }
    }

    let created = account_transaction::ActiveModel {
        transaction_date: Set(transaction.transaction_date),
        transaction_type: Set(transaction.transaction_type),
        category_id: Set(transaction.category_id),
        amount: Set(transaction.amount),
        payment_method: Set(transaction.payment_method),
        vendor_customer: Set(transaction.vendor_customer),
        invoice_number: Set(transaction.invoice_number),
        receipt_number: Set(transaction.receipt_number),
        reference_number: Set(transaction.reference_number),
        description: Set(transaction.description),
        installment_id: Set(transaction.installment_id),
        service_ticket_id: Set(transaction.service_ticket_id),
        status: Set(TransactionStatus::Pending),
        created_by: Set(actor.to_string()),
        approved_by: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(
        "Created pending {:?} transaction {} of {} by {}",
        created.transaction_type, created.id, created.amount, actor
    );
    Ok(created)
}

pub async fn get_transaction(
    db: &DatabaseConnection,
    transaction_id: i32,
) -> Result<account_transaction::Model> {
    account_transaction::Entity::find_by_id(transaction_id)
        .one(db)
        .await?
        .ok_or_else(|| ComputeError::not_found("AccountTransaction", transaction_id))
}

fn finalized(transaction: &account_transaction::Model) -> ComputeError {
    StateConflict::AlreadyFinalized {
        transaction_id: transaction.id,
        status: transaction.status.to_value(),
    }
    .into()
}

/// Edits a pending transaction. Changing the type or the category re-checks that they match.
#[instrument(skip(db, patch))]
pub async fn update_transaction(
    db: &DatabaseConnection,
    transaction_id: i32,
    patch: TransactionPatch,
) -> Result<account_transaction::Model> {
    let txn = db.begin().await?;
    let existing = account_transaction::Entity::find_by_id(transaction_id)
        .one(&txn)
        .await?
        .ok_or_else(|| ComputeError::not_found("AccountTransaction", transaction_id))?;
    if existing.status != TransactionStatus::Pending {
        return Err(finalized(&existing));
    }

    if let Some(amount) = patch.amount {
        Money::non_negative("amount", amount)?;
    }
    let transaction_type = patch.transaction_type.unwrap_or(existing.transaction_type);
    let category_id = patch.category_id.unwrap_or(existing.category_id);
    if transaction_type != existing.transaction_type || category_id != existing.category_id {
        ensure_category_accepts(&txn, category_id, transaction_type).await?;
    }

    let mut active = account_transaction::ActiveModel {
        transaction_type: Set(transaction_type),
        category_id: Set(category_id),
        ..Default::default()
    };
    if let Some(date) = patch.transaction_date {
        active.transaction_date = Set(date);
    }
    if let Some(amount) = patch.amount {
        active.amount = Set(amount);
    }
    if let Some(method) = patch.payment_method {
        active.payment_method = Set(method);
    }
    if let Some(value) = patch.vendor_customer {
        active.vendor_customer = Set(Some(value));
    }
    if let Some(value) = patch.invoice_number {
        active.invoice_number = Set(Some(value));
    }
    if let Some(value) = patch.receipt_number {
        active.receipt_number = Set(Some(value));
    }
    if let Some(value) = patch.reference_number {
        active.reference_number = Set(Some(value));
    }
    if let Some(value) = patch.description {
        active.description = Set(Some(value));
    }

    let updated = account_transaction::Entity::update_many()
        .set(active)
        .filter(account_transaction::Column::Id.eq(transaction_id))
        .filter(account_transaction::Column::Status.eq(TransactionStatus::Pending))
        .exec(&txn)
        .await?;
    if updated.rows_affected != 1 {
        return Err(StateConflict::ConcurrentModification {
            entity: "AccountTransaction",
            id: transaction_id,
        }
        .into());
    }

    let transaction = account_transaction::Entity::find_by_id(transaction_id)
        .one(&txn)
        .await?
        .ok_or_else(|| ComputeError::not_found("AccountTransaction", transaction_id))?;
    txn.commit().await?;
    debug!("Updated transaction {}", transaction_id);
    Ok(transaction)
}

/// Moves a pending transaction to `to`, failing with `AlreadyFinalized` if it already left pending.
async fn decide(
    db: &DatabaseConnection,
    transaction_id: i32,
    to: TransactionStatus,
    approved_by: Option<String>,
) -> Result<account_transaction::Model> {
    let mut active = account_transaction::ActiveModel {
        status: Set(to),
        ..Default::default()
    };
    if approved_by.is_some() {
        active.approved_by = Set(approved_by);
    }

    let txn = db.begin().await?;
    let result = account_transaction::Entity::update_many()
        .set(active)
        .filter(account_transaction::Column::Id.eq(transaction_id))
        .filter(account_transaction::Column::Status.eq(TransactionStatus::Pending))
        .exec(&txn)
        .await?;

    let transaction = account_transaction::Entity::find_by_id(transaction_id)
        .one(&txn)
        .await?
        .ok_or_else(|| ComputeError::not_found("AccountTransaction", transaction_id))?;
    if result.rows_affected != 1 {
        return Err(finalized(&transaction));
    }
    txn.commit().await?;
    Ok(transaction)
}

#[instrument(skip(db))]
pub async fn approve_transaction(
    db: &DatabaseConnection,
    transaction_id: i32,
    actor: &str,
) -> Result<account_transaction::Model> {
    let approved = decide(
        db,
        transaction_id,
        TransactionStatus::Approved,
        Some(actor.to_string()),
    )
    .await?;
    info!("Transaction {} approved by {}", transaction_id, actor);
    Ok(approved)
}

#[instrument(skip(db))]
pub async fn reject_transaction(
    db: &DatabaseConnection,
    transaction_id: i32,
    actor: &str,
) -> Result<account_transaction::Model> {
    let rejected = decide(db, transaction_id, TransactionStatus::Rejected, None).await?;
    info!("Transaction {} rejected by {}", transaction_id, actor);
    Ok(rejected)
}

/// Hard delete, whatever the status.
#[instrument(skip(db))]
pub async fn delete_transaction(db: &DatabaseConnection, transaction_id: i32) -> Result<()> {
    let result = account_transaction::Entity::delete_by_id(transaction_id)
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(ComputeError::not_found("AccountTransaction", transaction_id));
    }
    info!("Deleted transaction {}", transaction_id);
    Ok(())
}

pub async fn list_transactions(
    db: &DatabaseConnection,
    filter: &TransactionFilter,
) -> Result<Vec<account_transaction::Model>> {
    let mut query = account_transaction::Entity::find();
    if let Some(status) = filter.status {
        query = query.filter(account_transaction::Column::Status.eq(status));
    }
    if let Some(transaction_type) = filter.transaction_type {
        query = query.filter(account_transaction::Column::TransactionType.eq(transaction_type));
    }
    if let Some(category_id) = filter.category_id {
        query = query.filter(account_transaction::Column::CategoryId.eq(category_id));
    }
    if let Some(from) = filter.from {
        query = query.filter(account_transaction::Column::TransactionDate.gte(from));
    }
    if let Some(to) = filter.to {
        query = query.filter(account_transaction::Column::TransactionDate.lte(to));
    }
    Ok(query
        .order_by_desc(account_transaction::Column::TransactionDate)
        .order_by_desc(account_transaction::Column::Id)
        .all(db)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{date, insert_category, setup_db};
    use sea_orm::PaginatorTrait;

    #[tokio::test]
    async fn test_create_forces_pending_and_stamps_actor() {
        let db = setup_db().await;
        let income = insert_category(&db, "Service Income", EntryType::Income).await;

        let created = create_transaction(
            &db,
            NewTransaction::new(date(2024, 3, 5), EntryType::Income, income.id, 5_000),
            "clerk-1",
        )
        .await
        .unwrap();

        assert_eq!(created.status, TransactionStatus::Pending);
        assert_eq!(created.created_by, "clerk-1");
        assert_eq!(created.approved_by, None);
    }

    #[tokio::test]
    async fn test_category_type_mismatch_writes_nothing() {
        let db = setup_db().await;
        let salary = insert_category(&db, "Salary", EntryType::Expense).await;

        let err = create_transaction(
            &db,
            NewTransaction::new(date(2024, 3, 5), EntryType::Income, salary.id, 5_000),
            "clerk-1",
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            ComputeError::Validation(ValidationError::CategoryTypeMismatch { .. })
        ));

        let rows = account_transaction::Entity::find().count(&db).await.unwrap();
        assert_eq!(rows, 0);
    }

    #[tokio::test]
    async fn test_negative_amount_and_unknown_category() {
        let db = setup_db().await;
        let income = insert_category(&db, "Service Income", EntryType::Income).await;

        let err = create_transaction(
            &db,
            NewTransaction::new(date(2024, 3, 5), EntryType::Income, income.id, -10),
            "clerk-1",
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), "NEGATIVE_AMOUNT");

        let err = create_transaction(
            &db,
            NewTransaction::new(date(2024, 3, 5), EntryType::Income, 999, 10),
            "clerk-1",
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            ComputeError::NotFound {
                entity: "AccountCategory",
                id: 999
            }
        ));
    }

    #[tokio::test]
    async fn test_approve_then_decisions_are_final() {
        let db = setup_db().await;
        let income = insert_category(&db, "Service Income", EntryType::Income).await;
        let created = create_transaction(
            &db,
            NewTransaction::new(date(2024, 3, 5), EntryType::Income, income.id, 5_000),
            "clerk-1",
        )
        .await
        .unwrap();

        let approved = approve_transaction(&db, created.id, "manager-1").await.unwrap();
        assert_eq!(approved.status, TransactionStatus::Approved);
        assert_eq!(approved.approved_by.as_deref(), Some("manager-1"));

        for err in [
            approve_transaction(&db, created.id, "manager-2").await.unwrap_err(),
            reject_transaction(&db, created.id, "manager-2").await.unwrap_err(),
            update_transaction(
                &db,
                created.id,
                TransactionPatch {
                    amount: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err(),
        ] {
            assert!(matches!(
                err,
                ComputeError::Conflict(StateConflict::AlreadyFinalized { ref status, .. }) if status == "approved"
            ));
        }

        let unchanged = get_transaction(&db, created.id).await.unwrap();
        assert_eq!(unchanged, approved);
    }

    #[tokio::test]
    async fn test_reject_leaves_approver_empty() {
        let db = setup_db().await;
        let income = insert_category(&db, "Service Income", EntryType::Income).await;
        let created = create_transaction(
            &db,
            NewTransaction::new(date(2024, 3, 5), EntryType::Income, income.id, 5_000),
            "clerk-1",
        )
        .await
        .unwrap();

        let rejected = reject_transaction(&db, created.id, "manager-1").await.unwrap();
        assert_eq!(rejected.status, TransactionStatus::Rejected);
        assert_eq!(rejected.approved_by, None);

        let err = approve_transaction(&db, created.id, "manager-1").await.unwrap_err();
        assert_eq!(err.code(), "ALREADY_FINALIZED");
    }

    #[tokio::test]
    async fn test_update_rechecks_category_type() {
        let db = setup_db().await;
        let income = insert_category(&db, "Service Income", EntryType::Income).await;
        let salary = insert_category(&db, "Salary", EntryType::Expense).await;
        let created = create_transaction(
            &db,
            NewTransaction::new(date(2024, 3, 5), EntryType::Income, income.id, 5_000),
            "clerk-1",
        )
        .await
        .unwrap();

        let err = update_transaction(
            &db,
            created.id,
            TransactionPatch {
                category_id: Some(salary.id),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), "CATEGORY_TYPE_MISMATCH");

        let updated = update_transaction(
            &db,
            created.id,
            TransactionPatch {
                category_id: Some(salary.id),
                transaction_type: Some(EntryType::Expense),
                amount: Some(4_000),
                description: Some("March salary".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.transaction_type, EntryType::Expense);
        assert_eq!(updated.category_id, salary.id);
        assert_eq!(updated.amount, 4_000);
        assert_eq!(updated.description.as_deref(), Some("March salary"));
        assert_eq!(updated.status, TransactionStatus::Pending);
    }

    #[tokio::test]
    async fn test_delete_is_unconditional() {
        let db = setup_db().await;
        let income = insert_category(&db, "Service Income", EntryType::Income).await;
        let created = create_transaction(
            &db,
            NewTransaction::new(date(2024, 3, 5), EntryType::Income, income.id, 5_000),
            "clerk-1",
        )
        .await
        .unwrap();
        approve_transaction(&db, created.id, "manager-1").await.unwrap();

        delete_transaction(&db, created.id).await.unwrap();
        assert!(matches!(
            get_transaction(&db, created.id).await,
            Err(ComputeError::NotFound { .. })
        ));
        assert!(matches!(
            delete_transaction(&db, created.id).await,
            Err(ComputeError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let db = setup_db().await;
        let income = insert_category(&db, "Service Income", EntryType::Income).await;
        let salary = insert_category(&db, "Salary", EntryType::Expense).await;

        let a = create_transaction(
            &db,
            NewTransaction::new(date(2024, 3, 5), EntryType::Income, income.id, 5_000),
            "clerk-1",
        )
        .await
        .unwrap();
        create_transaction(
            &db,
            NewTransaction::new(date(2024, 3, 25), EntryType::Expense, salary.id, 2_000),
            "clerk-1",
        )
        .await
        .unwrap();
        create_transaction(
            &db,
            NewTransaction::new(date(2024, 4, 1), EntryType::Income, income.id, 700),
            "clerk-1",
        )
        .await
        .unwrap();
        approve_transaction(&db, a.id, "manager-1").await.unwrap();

        let march = list_transactions(
            &db,
            &TransactionFilter {
                from: Some(date(2024, 3, 1)),
                to: Some(date(2024, 3, 31)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(march.len(), 2);
        assert_eq!(march[0].transaction_date, date(2024, 3, 25));

        let approved = list_transactions(
            &db,
            &TransactionFilter {
                status: Some(TransactionStatus::Approved),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(approved.len(), 1);
        assert_eq!(approved[0].id, a.id);

        let expenses = list_transactions(
            &db,
            &TransactionFilter {
                transaction_type: Some(EntryType::Expense),
                category_id: Some(salary.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(expenses.len(), 1);
    }

    #[tokio::test]
    async fn test_category_names_are_unique_ignoring_case() {
        let db = setup_db().await;
        create_category(
            &db,
            NewCategory {
                name: "Salary".to_string(),
                category_type: EntryType::Expense,
                description: Some("Monthly payroll".to_string()),
            },
        )
        .await
        .unwrap();

        let err = create_category(
            &db,
            NewCategory {
                name: " salary ".to_string(),
                category_type: EntryType::Expense,
                description: None,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), "DUPLICATE_CATEGORY");

        let expenses = list_categories(&db, Some(EntryType::Expense)).await.unwrap();
        assert_eq!(expenses.len(), 1);
        assert!(list_categories(&db, Some(EntryType::Income)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_category_creation_keeps_one() {
        let db = setup_db().await;
        let rent = |name: &str| NewCategory {
            name: name.to_string(),
            category_type: EntryType::Expense,
            description: None,
        };

        let (first, second) = tokio::join!(
            create_category(&db, rent("Rent")),
            create_category(&db, rent("RENT")),
        );
        let outcomes = [first, second];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes.iter().any(|r| matches!(
            r,
            Err(ComputeError::Conflict(StateConflict::DuplicateCategory { .. }))
        )));

        let expenses = list_categories(&db, Some(EntryType::Expense)).await.unwrap();
        assert_eq!(expenses.len(), 1);
    }
}
