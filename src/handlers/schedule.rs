use crate::schemas::{ApiError, ErrorResponse, ApiResponse, AppState, engine_error};
use axum::{extract::State, response::Json};
use chrono::NaiveDate;
use common::MoneyDto;
use compute::Money;
use compute::schedule::{self, parse_frequency};
use sea_orm::ActiveEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::ToSchema;

/// Request body for previewing a schedule without storing anything
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct SchedulePreviewRequest {
    /// Total to split, in minor currency units
    pub total: i64,
    pub agreement_date: NaiveDate,
    /// One of full, half_yearly, quarterly, three_times, monthly
    pub payment_frequency: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ScheduledInstallmentResponse {
    pub payment_number: i32,
    pub due_date: NaiveDate,
    pub amount: MoneyDto,
    pub reminder_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SchedulePreviewResponse {
    pub total: MoneyDto,
    pub payment_frequency: String,
    pub installments: Vec<ScheduledInstallmentResponse>,
}

/// Preview the installment schedule for a total and frequency
#[utoipa::path(
    post,
    path = "/api/v1/schedule/preview",
    tag = "schedule",
    request_body = SchedulePreviewRequest,
    responses(
        (status = 200, description = "Generated schedule", body = ApiResponse<SchedulePreviewResponse>),
        (status = 400, description = "Negative total or unknown frequency", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn preview_schedule(
    State(state): State<AppState>,
    Json(request): Json<SchedulePreviewRequest>,
) -> Result<Json<ApiResponse<SchedulePreviewResponse>>, ApiError> {
    let frequency = parse_frequency(&request.payment_frequency).map_err(engine_error)?;
    let generated = schedule::generate(
        Money::from_minor(request.total),
        request.agreement_date,
        frequency,
    )
    .map_err(engine_error)?;
    debug!("Previewed {} installments", generated.len());

    let installments = generated
        .iter()
        .map(|row| ScheduledInstallmentResponse {
            payment_number: row.payment_number,
            due_date: row.due_date,
            amount: MoneyDto::new(row.amount.minor(), &state.currency),
            reminder_date: row.reminder_date(),
        })
        .collect();

    Ok(Json(ApiResponse::ok(
        SchedulePreviewResponse {
            total: MoneyDto::new(request.total, &state.currency),
            payment_frequency: frequency.to_value(),
            installments,
        },
        "Schedule generated",
    )))
}
