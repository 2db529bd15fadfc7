use crate::handlers::{parse_enum, parse_optional_enum};
use crate::identity::Actor;
use crate::schemas::{ApiError, ErrorResponse, ApiResponse, AppState, engine_error};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::NaiveDate;
use common::{CurrencyCode, MoneyDto};
use compute::ledger::{self, NewTransaction, TransactionFilter, TransactionPatch};
use model::entities::account_category::EntryType;
use model::entities::account_transaction::{self, TransactionStatus};
use model::entities::agreement::PaymentMode;
use sea_orm::ActiveEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Request body for booking a ledger transaction. It is created as pending.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateTransactionRequest {
    pub transaction_date: NaiveDate,
    /// income or expense; must match the category's type
    pub transaction_type: String,
    pub category_id: i32,
    /// Amount in minor currency units
    pub amount: i64,
    /// One of cash, cheque, bank_transfer, other (default: cash)
    pub payment_method: Option<String>,
    #[validate(length(max = 200))]
    pub vendor_customer: Option<String>,
    #[validate(length(max = 100))]
    pub invoice_number: Option<String>,
    #[validate(length(max = 100))]
    pub receipt_number: Option<String>,
    #[validate(length(max = 100))]
    pub reference_number: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    /// Installment this entry relates to
    pub installment_id: Option<i32>,
    /// Service ticket this entry relates to
    pub service_ticket_id: Option<i32>,
}

/// Request body for editing a pending transaction. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateTransactionRequest {
    pub transaction_date: Option<NaiveDate>,
    pub transaction_type: Option<String>,
    pub category_id: Option<i32>,
    pub amount: Option<i64>,
    pub payment_method: Option<String>,
    #[validate(length(max = 200))]
    pub vendor_customer: Option<String>,
    #[validate(length(max = 100))]
    pub invoice_number: Option<String>,
    #[validate(length(max = 100))]
    pub receipt_number: Option<String>,
    #[validate(length(max = 100))]
    pub reference_number: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

/// Query parameters for listing transactions
#[derive(Debug, Deserialize, IntoParams)]
pub struct TransactionQuery {
    /// pending, approved or rejected
    pub status: Option<String>,
    /// income or expense
    pub transaction_type: Option<String>,
    pub category_id: Option<i32>,
    /// First date to include (YYYY-MM-DD)
    pub from: Option<NaiveDate>,
    /// Last date to include (YYYY-MM-DD)
    pub to: Option<NaiveDate>,
}

/// Ledger transaction response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    pub id: i32,
    pub transaction_date: NaiveDate,
    pub transaction_type: String,
    pub category_id: i32,
    pub amount: MoneyDto,
    pub payment_method: String,
    pub vendor_customer: Option<String>,
    pub invoice_number: Option<String>,
    pub receipt_number: Option<String>,
    pub reference_number: Option<String>,
    pub description: Option<String>,
    pub installment_id: Option<i32>,
    pub service_ticket_id: Option<i32>,
    /// pending, approved or rejected
    pub status: String,
    pub created_by: String,
    pub approved_by: Option<String>,
}

impl TransactionResponse {
    pub fn new(model: account_transaction::Model, currency: &CurrencyCode) -> Self {
        Self {
            id: model.id,
            transaction_date: model.transaction_date,
            transaction_type: model.transaction_type.to_value(),
            category_id: model.category_id,
            amount: MoneyDto::new(model.amount, currency),
            payment_method: model.payment_method.to_value(),
            vendor_customer: model.vendor_customer,
            invoice_number: model.invoice_number,
            receipt_number: model.receipt_number,
            reference_number: model.reference_number,
            description: model.description,
            installment_id: model.installment_id,
            service_ticket_id: model.service_ticket_id,
            status: model.status.to_value(),
            created_by: model.created_by,
            approved_by: model.approved_by,
        }
    }
}

/// Book a new transaction
#[utoipa::path(
    post,
    path = "/api/v1/transactions",
    tag = "transactions",
    request_body = CreateTransactionRequest,
    responses(
        (status = 201, description = "Transaction created as pending", body = ApiResponse<TransactionResponse>),
        (status = 400, description = "Invalid request or category type mismatch", body = ErrorResponse),
        (status = 401, description = "Missing x-user-id header", body = ErrorResponse),
        (status = 404, description = "Category or installment not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_transaction(
    State(state): State<AppState>,
    actor: Actor,
    Valid(Json(request)): Valid<Json<CreateTransactionRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<TransactionResponse>>), ApiError> {
    trace!("Entering create_transaction function");
    let transaction_type = parse_enum::<EntryType>("transaction type", &request.transaction_type)?;
    let payment_method = parse_optional_enum::<PaymentMode>("payment method", request.payment_method.as_deref())?
        .unwrap_or(PaymentMode::Cash);

    let new_transaction = NewTransaction {
        transaction_date: request.transaction_date,
        transaction_type,
        category_id: request.category_id,
        amount: request.amount,
        payment_method,
        vendor_customer: request.vendor_customer,
        invoice_number: request.invoice_number,
        receipt_number: request.receipt_number,
        reference_number: request.reference_number,
        description: request.description,
        installment_id: request.installment_id,
        service_ticket_id: request.service_ticket_id,
    };
    let created = ledger::create_transaction(&state.db, new_transaction, actor.id())
        .await
        .map_err(engine_error)?;
    state.invalidate_summaries();

    info!("Transaction {} created by {}", created.id, actor.id());
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            TransactionResponse::new(created, &state.currency),
            "Transaction created successfully",
        )),
    ))
}

/// List transactions
#[utoipa::path(
    get,
    path = "/api/v1/transactions",
    tag = "transactions",
    params(TransactionQuery),
    responses(
        (status = 200, description = "Transactions retrieved", body = ApiResponse<Vec<TransactionResponse>>),
        (status = 400, description = "Unknown status or type", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_transactions(
    State(state): State<AppState>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<ApiResponse<Vec<TransactionResponse>>>, ApiError> {
    let filter = TransactionFilter {
        status: parse_optional_enum::<TransactionStatus>("transaction status", query.status.as_deref())?,
        transaction_type: parse_optional_enum::<EntryType>(
            "transaction type",
            query.transaction_type.as_deref(),
        )?,
        category_id: query.category_id,
        from: query.from,
        to: query.to,
    };
    let transactions = ledger::list_transactions(&state.db, &filter)
        .await
        .map_err(engine_error)?;
    debug!("Retrieved {} transactions", transactions.len());

    let data = transactions
        .into_iter()
        .map(|t| TransactionResponse::new(t, &state.currency))
        .collect();
    Ok(Json(ApiResponse::ok(data, "Transactions retrieved successfully")))
}

/// Get a transaction
#[utoipa::path(
    get,
    path = "/api/v1/transactions/{transaction_id}",
    tag = "transactions",
    params(("transaction_id" = i32, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Transaction retrieved", body = ApiResponse<TransactionResponse>),
        (status = 404, description = "Transaction not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_transaction(
    Path(transaction_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<TransactionResponse>>, ApiError> {
    let transaction = ledger::get_transaction(&state.db, transaction_id)
        .await
        .map_err(engine_error)?;
    Ok(Json(ApiResponse::ok(
        TransactionResponse::new(transaction, &state.currency),
        "Transaction retrieved successfully",
    )))
}

/// Edit a pending transaction
#[utoipa::path(
    patch,
    path = "/api/v1/transactions/{transaction_id}",
    tag = "transactions",
    params(("transaction_id" = i32, Path, description = "Transaction ID")),
    request_body = UpdateTransactionRequest,
    responses(
        (status = 200, description = "Transaction updated", body = ApiResponse<TransactionResponse>),
        (status = 400, description = "Invalid request or category type mismatch", body = ErrorResponse),
        (status = 404, description = "Transaction not found", body = ErrorResponse),
        (status = 409, description = "Transaction already approved or rejected", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_transaction(
    Path(transaction_id): Path<i32>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<UpdateTransactionRequest>>,
) -> Result<Json<ApiResponse<TransactionResponse>>, ApiError> {
    let patch = TransactionPatch {
        transaction_date: request.transaction_date,
        transaction_type: parse_optional_enum::<EntryType>(
            "transaction type",
            request.transaction_type.as_deref(),
        )?,
        category_id: request.category_id,
        amount: request.amount,
        payment_method: parse_optional_enum::<PaymentMode>(
            "payment method",
            request.payment_method.as_deref(),
        )?,
        vendor_customer: request.vendor_customer,
        invoice_number: request.invoice_number,
        receipt_number: request.receipt_number,
        reference_number: request.reference_number,
        description: request.description,
    };
    let updated = ledger::update_transaction(&state.db, transaction_id, patch)
        .await
        .map_err(engine_error)?;
    state.invalidate_summaries();

    Ok(Json(ApiResponse::ok(
        TransactionResponse::new(updated, &state.currency),
        "Transaction updated successfully",
    )))
}

/// Delete a transaction, whatever its status
#[utoipa::path(
    delete,
    path = "/api/v1/transactions/{transaction_id}",
    tag = "transactions",
    params(("transaction_id" = i32, Path, description = "Transaction ID")),
    responses(
        (status = 204, description = "Transaction deleted"),
        (status = 404, description = "Transaction not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_transaction(
    Path(transaction_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    ledger::delete_transaction(&state.db, transaction_id)
        .await
        .map_err(engine_error)?;
    state.invalidate_summaries();
    info!("Transaction {} deleted", transaction_id);
    Ok(StatusCode::NO_CONTENT)
}

/// Approve a pending transaction
#[utoipa::path(
    post,
    path = "/api/v1/transactions/{transaction_id}/approve",
    tag = "transactions",
    params(("transaction_id" = i32, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Transaction approved", body = ApiResponse<TransactionResponse>),
        (status = 401, description = "Missing x-user-id header", body = ErrorResponse),
        (status = 404, description = "Transaction not found", body = ErrorResponse),
        (status = 409, description = "Transaction already approved or rejected", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn approve_transaction(
    Path(transaction_id): Path<i32>,
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<ApiResponse<TransactionResponse>>, ApiError> {
    let approved = ledger::approve_transaction(&state.db, transaction_id, actor.id())
        .await
        .map_err(engine_error)?;
    state.invalidate_summaries();

    Ok(Json(ApiResponse::ok(
        TransactionResponse::new(approved, &state.currency),
        "Transaction approved",
    )))
}

/// Reject a pending transaction
#[utoipa::path(
    post,
    path = "/api/v1/transactions/{transaction_id}/reject",
    tag = "transactions",
    params(("transaction_id" = i32, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Transaction rejected", body = ApiResponse<TransactionResponse>),
        (status = 401, description = "Missing x-user-id header", body = ErrorResponse),
        (status = 404, description = "Transaction not found", body = ErrorResponse),
        (status = 409, description = "Transaction already approved or rejected", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn reject_transaction(
    Path(transaction_id): Path<i32>,
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<ApiResponse<TransactionResponse>>, ApiError> {
    let rejected = ledger::reject_transaction(&state.db, transaction_id, actor.id())
        .await
        .map_err(engine_error)?;
    state.invalidate_summaries();

    Ok(Json(ApiResponse::ok(
        TransactionResponse::new(rejected, &state.currency),
        "Transaction rejected",
    )))
}
