use axum::{http::StatusCode, response::Json};
use common::{CurrencyCode, FinancialSummaryDto, MoneyDto, MonthPeriod, YearlySummaryDto};
use compute::{ComputeError, summary::SummaryPolicy};
use moka::future::Cache;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use utoipa::{OpenApi, ToSchema};

use crate::handlers::{
    agreements::{
        AgreementDetailResponse, AgreementResponse, CreateAgreementRequest,
        UpdateAgreementRequest,
    },
    categories::{CategoryResponse, CreateCategoryRequest},
    installments::{
        InstallmentResponse, PaymentOutcomeResponse, PaymentRecordResponse, RecordPaymentRequest,
    },
    schedule::{SchedulePreviewRequest, SchedulePreviewResponse, ScheduledInstallmentResponse},
    transactions::{CreateTransactionRequest, TransactionResponse, UpdateTransactionRequest},
};

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Computed summaries, dropped on every ledger write
    pub cache: Cache<String, CachedData>,
    /// Currency all amounts are denominated in
    pub currency: CurrencyCode,
    /// Which categories are reported as payroll and advances
    pub summary_policy: SummaryPolicy,
}

impl AppState {
    /// Drops every cached summary. Called after any write that can change an approved total.
    pub fn invalidate_summaries(&self) {
        self.cache.invalidate_all();
    }
}

/// Cached data types
#[derive(Clone, Debug)]
pub enum CachedData {
    Month(FinancialSummaryDto),
    Year(YearlySummaryDto),
}

/// API response wrapper
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: message.into(),
            success: true,
        }
    }
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Error half of every handler result.
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn error_response(status: StatusCode, code: &str, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.to_string(),
            success: false,
        }),
    )
}

/// Maps an engine error to its HTTP status and stable code.
///
/// Store failures are logged here and reported without their details.
pub fn engine_error(err: ComputeError) -> ApiError {
    let status = match &err {
        ComputeError::Validation(_) => StatusCode::BAD_REQUEST,
        ComputeError::Conflict(_) => StatusCode::CONFLICT,
        ComputeError::NotFound { .. } => StatusCode::NOT_FOUND,
        ComputeError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("Database error: {}", err);
        return error_response(status, err.code(), "Internal database error");
    }
    warn!("Request failed with {}: {}", err.code(), err);
    error_response(status, err.code(), err.to_string())
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::agreements::create_agreement,
        crate::handlers::agreements::get_agreements,
        crate::handlers::agreements::get_agreement,
        crate::handlers::agreements::update_agreement,
        crate::handlers::agreements::cancel_agreement,
        crate::handlers::agreements::get_agreement_installments,
        crate::handlers::agreements::get_agreement_payments,
        crate::handlers::installments::get_installments,
        crate::handlers::installments::get_reminders_due,
        crate::handlers::installments::record_payment,
        crate::handlers::installments::mark_reminder_sent,
        crate::handlers::installments::get_installment_payments,
        crate::handlers::schedule::preview_schedule,
        crate::handlers::categories::create_category,
        crate::handlers::categories::get_categories,
        crate::handlers::transactions::create_transaction,
        crate::handlers::transactions::get_transactions,
        crate::handlers::transactions::get_transaction,
        crate::handlers::transactions::update_transaction,
        crate::handlers::transactions::delete_transaction,
        crate::handlers::transactions::approve_transaction,
        crate::handlers::transactions::reject_transaction,
        crate::handlers::summary::get_month_summary,
        crate::handlers::summary::get_year_summary,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            MoneyDto,
            MonthPeriod,
            FinancialSummaryDto,
            YearlySummaryDto,
            CreateAgreementRequest,
            UpdateAgreementRequest,
            AgreementResponse,
            AgreementDetailResponse,
            InstallmentResponse,
            PaymentRecordResponse,
            RecordPaymentRequest,
            PaymentOutcomeResponse,
            SchedulePreviewRequest,
            SchedulePreviewResponse,
            ScheduledInstallmentResponse,
            CreateCategoryRequest,
            CategoryResponse,
            CreateTransactionRequest,
            UpdateTransactionRequest,
            TransactionResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "agreements", description = "Service agreements and their schedules"),
        (name = "installments", description = "Collections: payments, reminders and dashboards"),
        (name = "schedule", description = "Schedule preview"),
        (name = "categories", description = "Ledger categories"),
        (name = "transactions", description = "Ledger transactions and approval"),
        (name = "summary", description = "Financial summaries"),
    ),
    info(
        title = "BillDesk API",
        description = "Billing and collections engine for equipment-service agreements",
        version = "0.1.0",
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use compute::{StateConflict, ValidationError};

    #[test]
    fn test_engine_error_status_mapping() {
        let (status, body) = engine_error(ValidationError::InvalidPeriod { year: 2024, month: 13 }.into());
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.code, "INVALID_PERIOD");
        assert!(!body.success);

        let (status, body) = engine_error(StateConflict::AlreadyPaid { installment_id: 3 }.into());
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.code, "ALREADY_PAID");

        let (status, body) = engine_error(ComputeError::not_found("Agreement", 9));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "Agreement with id 9 not found");

        let (status, body) = engine_error(sea_orm::DbErr::Custom("disk full".to_string()).into());
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.code, "DATABASE_ERROR");
        assert!(!body.error.contains("disk full"));
    }
}
