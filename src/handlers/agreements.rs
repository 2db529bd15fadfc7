use crate::handlers::installments::{InstallmentResponse, PaymentRecordResponse};
use crate::handlers::{parse_optional_enum, today_or_now};
use crate::schemas::{ApiError, ErrorResponse, ApiResponse, AppState, engine_error};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::{NaiveDate, NaiveDateTime};
use common::{CurrencyCode, MoneyDto};
use compute::agreement::{
    self as engine, AgreementPatch, AgreementWithSchedule, EquipmentLine, NewAgreement, Pricing,
    PricingPatch,
};
use compute::collections;
use compute::schedule::parse_frequency;
use model::entities::agreement::{self, AgreementStatus, PaymentMode};
use sea_orm::ActiveEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Request body for creating an agreement.
///
/// Counts and rates default to zero. Rates, charges and the discount are in minor currency units.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateAgreementRequest {
    /// Client reference
    #[validate(range(min = 1))]
    pub client_id: i32,
    /// Agreement date; the first installment falls due on it (YYYY-MM-DD)
    pub agreement_date: NaiveDate,
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
    /// Flat networking charge
    pub networking_charge: Option<i64>,
    pub discount: Option<i64>,
    /// One of full, half_yearly, quarterly, three_times, monthly
    pub payment_frequency: String,
    /// One of cash, cheque, bank_transfer, other (default: cash)
    pub payment_mode: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Request body for editing an active agreement. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateAgreementRequest {
    pub agreement_date: Option<NaiveDate>,
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
    pub payment_frequency: Option<String>,
    pub payment_mode: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

impl UpdateAgreementRequest {
    fn pricing_patch(&self) -> PricingPatch {
        PricingPatch {
            desktop_count: self.desktop_count,
            desktop_rate: self.desktop_rate,
            laptop_count: self.laptop_count,
            laptop_rate: self.laptop_rate,
            printer_count: self.printer_count,
            printer_rate: self.printer_rate,
            server_count: self.server_count,
            server_rate: self.server_rate,
            scanner_count: self.scanner_count,
            scanner_rate: self.scanner_rate,
            networking_charge: self.networking_charge,
            discount: self.discount,
        }
    }
}

/// Query parameters for listing agreements
#[derive(Debug, Deserialize, IntoParams)]
pub struct AgreementQuery {
    /// Filter by status (active, completed, cancelled)
    pub status: Option<String>,
    /// Filter by client
    pub client_id: Option<i32>,
}

/// Query parameters carrying the reference date for due-date views
#[derive(Debug, Deserialize, IntoParams)]
pub struct TodayQuery {
    /// Reference date (YYYY-MM-DD); defaults to the current UTC date
    pub today: Option<NaiveDate>,
}

/// Agreement response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AgreementResponse {
    pub id: i32,
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
    pub networking_charge: i64,
    pub discount: MoneyDto,
    pub subtotal: MoneyDto,
    pub total_cost: MoneyDto,
    pub payment_frequency: String,
    pub payment_mode: String,
    pub status: String,
    pub notes: Option<String>,
    /// Incremented by every change to the agreement or its schedule
    pub version: i32,
    pub created_at: NaiveDateTime,
}

impl AgreementResponse {
    pub fn new(model: agreement::Model, currency: &CurrencyCode) -> Self {
        Self {
            id: model.id,
            client_id: model.client_id,
            agreement_date: model.agreement_date,
            desktop_count: model.desktop_count,
            desktop_rate: model.desktop_rate,
            laptop_count: model.laptop_count,
            laptop_rate: model.laptop_rate,
            printer_count: model.printer_count,
            printer_rate: model.printer_rate,
            server_count: model.server_count,
            server_rate: model.server_rate,
            scanner_count: model.scanner_count,
            scanner_rate: model.scanner_rate,
            networking_charge: model.networking_charge,
            discount: MoneyDto::new(model.discount, currency),
            subtotal: MoneyDto::new(model.subtotal, currency),
            total_cost: MoneyDto::new(model.total_cost, currency),
            payment_frequency: model.payment_frequency.to_value(),
            payment_mode: model.payment_mode.to_value(),
            status: model.status.to_value(),
            notes: model.notes,
            version: model.version,
            created_at: model.created_at,
        }
    }
}

/// An agreement with its installment schedule
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AgreementDetailResponse {
    pub agreement: AgreementResponse,
    pub installments: Vec<InstallmentResponse>,
    /// True when this request replaced the schedule
    pub schedule_regenerated: bool,
}

impl AgreementDetailResponse {
    fn new(result: AgreementWithSchedule, currency: &CurrencyCode, today: NaiveDate) -> Self {
        Self {
            agreement: AgreementResponse::new(result.agreement, currency),
            installments: result
                .installments
                .into_iter()
                .map(|i| InstallmentResponse::new(i, currency, today))
                .collect(),
            schedule_regenerated: result.regenerated,
        }
    }
}

/// Create an agreement and generate its installment schedule
#[utoipa::path(
    post,
    path = "/api/v1/agreements",
    tag = "agreements",
    request_body = CreateAgreementRequest,
    responses(
        (status = 201, description = "Agreement created", body = ApiResponse<AgreementDetailResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_agreement(
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<CreateAgreementRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<AgreementDetailResponse>>), ApiError> {
    trace!("Entering create_agreement function");
    debug!(
        "Creating agreement for client {} with frequency {}",
        request.client_id, request.payment_frequency
    );

    let payment_frequency = parse_frequency(&request.payment_frequency).map_err(engine_error)?;
    let payment_mode = parse_optional_enum::<PaymentMode>("payment mode", request.payment_mode.as_deref())?
        .unwrap_or(PaymentMode::Cash);

    let line = |count: Option<i32>, rate: Option<i64>| {
        EquipmentLine::new(count.unwrap_or(0), rate.unwrap_or(0))
    };
    let new_agreement = NewAgreement {
        client_id: request.client_id,
        agreement_date: request.agreement_date,
        pricing: Pricing {
            desktops: line(request.desktop_count, request.desktop_rate),
            laptops: line(request.laptop_count, request.laptop_rate),
            printers: line(request.printer_count, request.printer_rate),
            servers: line(request.server_count, request.server_rate),
            scanners: line(request.scanner_count, request.scanner_rate),
            networking_charge: request.networking_charge.unwrap_or(0),
            discount: request.discount.unwrap_or(0),
        },
        payment_frequency,
        payment_mode,
        notes: request.notes,
    };

    let created = engine::create_agreement(&state.db, new_agreement)
        .await
        .map_err(engine_error)?;
    info!(
        "Agreement {} created with {} installments",
        created.agreement.id,
        created.installments.len()
    );

    let today = today_or_now(None);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            AgreementDetailResponse::new(created, &state.currency, today),
            "Agreement created successfully",
        )),
    ))
}

/// List agreements
#[utoipa::path(
    get,
    path = "/api/v1/agreements",
    tag = "agreements",
    params(AgreementQuery),
    responses(
        (status = 200, description = "Agreements retrieved", body = ApiResponse<Vec<AgreementResponse>>),
        (status = 400, description = "Unknown status", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_agreements(
    State(state): State<AppState>,
    Query(query): Query<AgreementQuery>,
) -> Result<Json<ApiResponse<Vec<AgreementResponse>>>, ApiError> {
    let status = parse_optional_enum::<AgreementStatus>("agreement status", query.status.as_deref())?;
    let agreements = engine::list_agreements(&state.db, status, query.client_id)
        .await
        .map_err(engine_error)?;
    debug!("Retrieved {} agreements", agreements.len());

    let data = agreements
        .into_iter()
        .map(|a| AgreementResponse::new(a, &state.currency))
        .collect();
    Ok(Json(ApiResponse::ok(data, "Agreements retrieved successfully")))
}

/// Get an agreement with its schedule
#[utoipa::path(
    get,
    path = "/api/v1/agreements/{agreement_id}",
    tag = "agreements",
    params(
        ("agreement_id" = i32, Path, description = "Agreement ID"),
        TodayQuery,
    ),
    responses(
        (status = 200, description = "Agreement retrieved", body = ApiResponse<AgreementDetailResponse>),
        (status = 404, description = "Agreement not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_agreement(
    Path(agreement_id): Path<i32>,
    State(state): State<AppState>,
    Query(query): Query<TodayQuery>,
) -> Result<Json<ApiResponse<AgreementDetailResponse>>, ApiError> {
    let agreement = engine::get_agreement(&state.db, agreement_id)
        .await
        .map_err(engine_error)?;
    let installments = collections::installments_for_agreement(&state.db, agreement_id)
        .await
        .map_err(engine_error)?;

    let detail = AgreementWithSchedule {
        agreement,
        installments,
        regenerated: false,
    };
    Ok(Json(ApiResponse::ok(
        AgreementDetailResponse::new(detail, &state.currency, today_or_now(query.today)),
        "Agreement retrieved successfully",
    )))
}

/// Edit an active agreement
///
/// Changing pricing, discount, frequency or the agreement date regenerates the schedule, which
/// is refused with 409 `SCHEDULE_LOCKED` once any installment has been paid.
#[utoipa::path(
    patch,
    path = "/api/v1/agreements/{agreement_id}",
    tag = "agreements",
    params(("agreement_id" = i32, Path, description = "Agreement ID")),
    request_body = UpdateAgreementRequest,
    responses(
        (status = 200, description = "Agreement updated", body = ApiResponse<AgreementDetailResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Agreement not found", body = ErrorResponse),
        (status = 409, description = "Agreement not active, schedule locked or concurrently modified", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_agreement(
    Path(agreement_id): Path<i32>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<UpdateAgreementRequest>>,
) -> Result<Json<ApiResponse<AgreementDetailResponse>>, ApiError> {
    trace!("Entering update_agreement for agreement_id: {}", agreement_id);

    let payment_frequency = request
        .payment_frequency
        .as_deref()
        .map(parse_frequency)
        .transpose()
        .map_err(engine_error)?;
    let payment_mode = parse_optional_enum::<PaymentMode>("payment mode", request.payment_mode.as_deref())?;

    let patch = AgreementPatch {
        agreement_date: request.agreement_date,
        pricing: request.pricing_patch(),
        payment_frequency,
        payment_mode,
        notes: request.notes,
    };
    let updated = engine::update_agreement(&state.db, agreement_id, patch)
        .await
        .map_err(engine_error)?;
    info!(
        "Agreement {} updated (schedule regenerated: {})",
        agreement_id, updated.regenerated
    );

    Ok(Json(ApiResponse::ok(
        AgreementDetailResponse::new(updated, &state.currency, today_or_now(None)),
        "Agreement updated successfully",
    )))
}

/// Cancel an active agreement
#[utoipa::path(
    post,
    path = "/api/v1/agreements/{agreement_id}/cancel",
    tag = "agreements",
    params(("agreement_id" = i32, Path, description = "Agreement ID")),
    responses(
        (status = 200, description = "Agreement cancelled", body = ApiResponse<AgreementResponse>),
        (status = 404, description = "Agreement not found", body = ErrorResponse),
        (status = 409, description = "Agreement not active", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn cancel_agreement(
    Path(agreement_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<AgreementResponse>>, ApiError> {
    let cancelled = engine::cancel_agreement(&state.db, agreement_id)
        .await
        .map_err(engine_error)?;
    Ok(Json(ApiResponse::ok(
        AgreementResponse::new(cancelled, &state.currency),
        "Agreement cancelled successfully",
    )))
}

/// Installment schedule of an agreement
#[utoipa::path(
    get,
    path = "/api/v1/agreements/{agreement_id}/installments",
    tag = "agreements",
    params(
        ("agreement_id" = i32, Path, description = "Agreement ID"),
        TodayQuery,
    ),
    responses(
        (status = 200, description = "Installments retrieved", body = ApiResponse<Vec<InstallmentResponse>>),
        (status = 404, description = "Agreement not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_agreement_installments(
    Path(agreement_id): Path<i32>,
    State(state): State<AppState>,
    Query(query): Query<TodayQuery>,
) -> Result<Json<ApiResponse<Vec<InstallmentResponse>>>, ApiError> {
    let today = today_or_now(query.today);
    let installments = collections::installments_for_agreement(&state.db, agreement_id)
        .await
        .map_err(engine_error)?;

    let data = installments
        .into_iter()
        .map(|i| InstallmentResponse::new(i, &state.currency, today))
        .collect();
    Ok(Json(ApiResponse::ok(data, "Installments retrieved successfully")))
}

/// Payment receipts of an agreement
#[utoipa::path(
    get,
    path = "/api/v1/agreements/{agreement_id}/payments",
    tag = "agreements",
    params(("agreement_id" = i32, Path, description = "Agreement ID")),
    responses(
        (status = 200, description = "Payments retrieved", body = ApiResponse<Vec<PaymentRecordResponse>>),
        (status = 404, description = "Agreement not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_agreement_payments(
    Path(agreement_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<PaymentRecordResponse>>>, ApiError> {
    let payments = collections::payments_for_agreement(&state.db, agreement_id)
        .await
        .map_err(engine_error)?;

    let data = payments
        .into_iter()
        .map(|p| PaymentRecordResponse::new(p, &state.currency))
        .collect();
    Ok(Json(ApiResponse::ok(data, "Payments retrieved successfully")))
}

