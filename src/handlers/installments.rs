use crate::handlers::{parse_optional_enum, today_or_now};
use crate::identity::Actor;
use crate::schemas::{ApiError, ErrorResponse, ApiResponse, AppState, engine_error, error_response};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::NaiveDate;
use common::{CurrencyCode, MoneyDto};
use compute::buckets::{self, Bucket};
use compute::collections::{self, LedgerMirror, PaymentInput, PaymentOutcome};
use compute::schedule::reminder_date;
use model::entities::agreement::PaymentMode;
use model::entities::{installment, payment_record};
use sea_orm::ActiveEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Installment response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InstallmentResponse {
    pub id: i32,
    pub agreement_id: i32,
    pub payment_number: i32,
    pub due_date: NaiveDate,
    pub amount: MoneyDto,
    /// pending or paid
    pub status: String,
    pub reminder_sent: bool,
    /// Seven days before the due date
    pub reminder_date: Option<NaiveDate>,
    /// Days from the reference date to the due date; negative when past due
    pub days_until_due: i64,
    /// Most urgent bucket (overdue, upcoming, this_month) for pending installments
    pub urgency: Option<String>,
}

impl InstallmentResponse {
    pub fn new(model: installment::Model, currency: &CurrencyCode, today: NaiveDate) -> Self {
        let urgency = buckets::urgency(&model, today).map(|b| b.as_str().to_string());
        Self {
            id: model.id,
            agreement_id: model.agreement_id,
            payment_number: model.payment_number,
            due_date: model.due_date,
            amount: MoneyDto::new(model.amount, currency),
            status: model.status.to_value(),
            reminder_sent: model.reminder_sent,
            reminder_date: reminder_date(model.due_date),
            days_until_due: buckets::days_until_due(model.due_date, today),
            urgency,
        }
    }
}

/// Payment receipt response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentRecordResponse {
    pub id: i32,
    pub installment_id: i32,
    pub agreement_id: i32,
    pub payment_date: NaiveDate,
    /// Amount actually received; may differ from the scheduled amount
    pub amount_paid: MoneyDto,
    pub payment_method: String,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
    pub recorded_by: Option<String>,
}

impl PaymentRecordResponse {
    pub fn new(model: payment_record::Model, currency: &CurrencyCode) -> Self {
        Self {
            id: model.id,
            installment_id: model.installment_id,
            agreement_id: model.agreement_id,
            payment_date: model.payment_date,
            amount_paid: MoneyDto::new(model.amount_paid, currency),
            payment_method: model.payment_method.to_value(),
            reference_number: model.reference_number,
            notes: model.notes,
            recorded_by: model.recorded_by,
        }
    }
}

/// Request body for recording a payment
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct RecordPaymentRequest {
    /// Amount received, in minor currency units
    pub amount_paid: i64,
    /// Date the money was received (default: today, UTC)
    pub payment_date: Option<NaiveDate>,
    /// One of cash, cheque, bank_transfer, other (default: cash)
    pub payment_method: Option<String>,
    #[validate(length(max = 100))]
    pub reference_number: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    /// Income category to mirror the payment into as an approved ledger entry.
    /// Requires the x-user-id header.
    pub ledger_category_id: Option<i32>,
}

/// Result of recording a payment
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentOutcomeResponse {
    pub installment: InstallmentResponse,
    pub payment: PaymentRecordResponse,
    /// True when this payment settled the agreement's last installment
    pub agreement_completed: bool,
    /// Id of the mirrored ledger transaction, if one was requested
    pub ledger_transaction_id: Option<i32>,
}

impl PaymentOutcomeResponse {
    fn new(outcome: PaymentOutcome, currency: &CurrencyCode, today: NaiveDate) -> Self {
        Self {
            installment: InstallmentResponse::new(outcome.installment, currency, today),
            payment: PaymentRecordResponse::new(outcome.payment, currency),
            agreement_completed: outcome.agreement_completed,
            ledger_transaction_id: outcome.ledger_entry.map(|t| t.id),
        }
    }
}

/// Query parameters for the collections dashboards
#[derive(Debug, Deserialize, IntoParams)]
pub struct InstallmentQuery {
    /// Restrict to one agreement
    pub agreement_id: Option<i32>,
    /// this_month, upcoming or overdue
    pub bucket: Option<String>,
    /// Reference date (YYYY-MM-DD); defaults to the current UTC date
    pub today: Option<NaiveDate>,
}

/// Query parameters for the reminder worklist
#[derive(Debug, Deserialize, IntoParams)]
pub struct ReminderQuery {
    /// Reference date (YYYY-MM-DD); defaults to the current UTC date
    pub today: Option<NaiveDate>,
}

/// Installments in a collections bucket, or the schedule of one agreement
///
/// With `bucket`, returns the pending installments in that bucket as of `today`, optionally
/// restricted to `agreement_id`. Without `bucket`, `agreement_id` is required and the full
/// schedule is returned.
#[utoipa::path(
    get,
    path = "/api/v1/installments",
    tag = "installments",
    params(InstallmentQuery),
    responses(
        (status = 200, description = "Installments retrieved", body = ApiResponse<Vec<InstallmentResponse>>),
        (status = 400, description = "Unknown bucket or missing filter", body = ErrorResponse),
        (status = 404, description = "Agreement not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_installments(
    State(state): State<AppState>,
    Query(query): Query<InstallmentQuery>,
) -> Result<Json<ApiResponse<Vec<InstallmentResponse>>>, ApiError> {
    trace!("Entering get_installments function");
    let today = today_or_now(query.today);

    let installments = match (query.bucket.as_deref(), query.agreement_id) {
        (Some(bucket), agreement_id) => {
            let bucket = Bucket::parse(bucket).map_err(engine_error)?;
            collections::installments_in_bucket(&state.db, bucket, today, agreement_id).await
        }
        (None, Some(agreement_id)) => {
            collections::installments_for_agreement(&state.db, agreement_id).await
        }
        (None, None) => {
            warn!("Installment listing without bucket or agreement_id");
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                "MISSING_FILTER",
                "Either bucket or agreement_id is required",
            ));
        }
    }
    .map_err(engine_error)?;
    debug!("Retrieved {} installments as of {}", installments.len(), today);

    let data = installments
        .into_iter()
        .map(|i| InstallmentResponse::new(i, &state.currency, today))
        .collect();
    Ok(Json(ApiResponse::ok(data, "Installments retrieved successfully")))
}

/// Upcoming installments whose reminder has not been sent
#[utoipa::path(
    get,
    path = "/api/v1/installments/reminders",
    tag = "installments",
    params(ReminderQuery),
    responses(
        (status = 200, description = "Reminders due", body = ApiResponse<Vec<InstallmentResponse>>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_reminders_due(
    State(state): State<AppState>,
    Query(query): Query<ReminderQuery>,
) -> Result<Json<ApiResponse<Vec<InstallmentResponse>>>, ApiError> {
    let today = today_or_now(query.today);
    let due = collections::reminders_due(&state.db, today)
        .await
        .map_err(engine_error)?;

    let data = due
        .into_iter()
        .map(|i| InstallmentResponse::new(i, &state.currency, today))
        .collect();
    Ok(Json(ApiResponse::ok(data, "Reminders retrieved successfully")))
}

/// Record a payment for an installment
#[utoipa::path(
    post,
    path = "/api/v1/installments/{installment_id}/payment",
    tag = "installments",
    params(("installment_id" = i32, Path, description = "Installment ID")),
    request_body = RecordPaymentRequest,
    responses(
        (status = 201, description = "Payment recorded", body = ApiResponse<PaymentOutcomeResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Ledger mirror requested without x-user-id", body = ErrorResponse),
        (status = 404, description = "Installment not found", body = ErrorResponse),
        (status = 409, description = "Installment already paid", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn record_payment(
    Path(installment_id): Path<i32>,
    State(state): State<AppState>,
    actor: Option<Actor>,
    Valid(Json(request)): Valid<Json<RecordPaymentRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<PaymentOutcomeResponse>>), ApiError> {
    trace!("Entering record_payment for installment_id: {}", installment_id);
    let today = today_or_now(None);

    let payment_method = parse_optional_enum::<PaymentMode>("payment method", request.payment_method.as_deref())?
        .unwrap_or(PaymentMode::Cash);
    let mirror = match (request.ledger_category_id, &actor) {
        (Some(category_id), Some(actor)) => Some(LedgerMirror {
            category_id,
            actor: actor.id().to_string(),
        }),
        (Some(_), None) => {
            return Err(error_response(
                StatusCode::UNAUTHORIZED,
                "MISSING_ACTOR",
                "The x-user-id header is required to mirror a payment into the ledger",
            ));
        }
        (None, _) => None,
    };

    let input = PaymentInput {
        amount_paid: request.amount_paid,
        payment_date: request.payment_date.unwrap_or(today),
        payment_method,
        reference_number: request.reference_number,
        notes: request.notes,
        recorded_by: actor.map(|a| a.0),
        mirror,
    };
    let outcome = collections::record_payment(&state.db, installment_id, input)
        .await
        .map_err(engine_error)?;

    if outcome.ledger_entry.is_some() {
        state.invalidate_summaries();
    }
    info!(
        "Payment {} recorded for installment {}",
        outcome.payment.id, installment_id
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            PaymentOutcomeResponse::new(outcome, &state.currency, today),
            "Payment recorded successfully",
        )),
    ))
}

/// Mark the reminder for an installment as sent
#[utoipa::path(
    post,
    path = "/api/v1/installments/{installment_id}/reminder-sent",
    tag = "installments",
    params(("installment_id" = i32, Path, description = "Installment ID")),
    responses(
        (status = 200, description = "Reminder flag set", body = ApiResponse<InstallmentResponse>),
        (status = 404, description = "Installment not found", body = ErrorResponse),
        (status = 409, description = "Installment already paid", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn mark_reminder_sent(
    Path(installment_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<InstallmentResponse>>, ApiError> {
    let installment = collections::mark_reminder_sent(&state.db, installment_id)
        .await
        .map_err(engine_error)?;
    Ok(Json(ApiResponse::ok(
        InstallmentResponse::new(installment, &state.currency, today_or_now(None)),
        "Reminder marked as sent",
    )))
}

/// Payment receipts of an installment
#[utoipa::path(
    get,
    path = "/api/v1/installments/{installment_id}/payments",
    tag = "installments",
    params(("installment_id" = i32, Path, description = "Installment ID")),
    responses(
        (status = 200, description = "Payments retrieved", body = ApiResponse<Vec<PaymentRecordResponse>>),
        (status = 404, description = "Installment not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_installment_payments(
    Path(installment_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<PaymentRecordResponse>>>, ApiError> {
    let payments = collections::payments_for_installment(&state.db, installment_id)
        .await
        .map_err(engine_error)?;

    let data = payments
        .into_iter()
        .map(|p| PaymentRecordResponse::new(p, &state.currency))
        .collect();
    Ok(Json(ApiResponse::ok(data, "Payments retrieved successfully")))
}
