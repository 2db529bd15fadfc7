use crate::handlers::{
    agreements::{
        cancel_agreement, create_agreement, get_agreement, get_agreement_installments,
        get_agreement_payments, get_agreements, update_agreement,
    },
    categories::{create_category, get_categories},
    health::health_check,
    installments::{
        get_installment_payments, get_installments, get_reminders_due, mark_reminder_sent,
        record_payment,
    },
    schedule::preview_schedule,
    summary::{get_month_summary, get_year_summary},
    transactions::{
        approve_transaction, create_transaction, delete_transaction, get_transaction,
        get_transactions, reject_transaction, update_transaction,
    },
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    Router,
    routing::{get, post},
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Agreements and their schedules
        .route(
            "/api/v1/agreements",
            post(create_agreement).get(get_agreements),
        )
        .route(
            "/api/v1/agreements/:agreement_id",
            get(get_agreement).patch(update_agreement),
        )
        .route(
            "/api/v1/agreements/:agreement_id/cancel",
            post(cancel_agreement),
        )
        .route(
            "/api/v1/agreements/:agreement_id/installments",
            get(get_agreement_installments),
        )
        .route(
            "/api/v1/agreements/:agreement_id/payments",
            get(get_agreement_payments),
        )
        // Collections
        .route("/api/v1/installments", get(get_installments))
        .route("/api/v1/installments/reminders", get(get_reminders_due))
        .route(
            "/api/v1/installments/:installment_id/payment",
            post(record_payment),
        )
        .route(
            "/api/v1/installments/:installment_id/payments",
            get(get_installment_payments),
        )
        .route(
            "/api/v1/installments/:installment_id/reminder-sent",
            post(mark_reminder_sent),
        )
        .route("/api/v1/schedule/preview", post(preview_schedule))
        // Ledger
        .route(
            "/api/v1/categories",
            post(create_category).get(get_categories),
        )
        .route(
            "/api/v1/transactions",
            post(create_transaction).get(get_transactions),
        )
        .route(
            "/api/v1/transactions/:transaction_id",
            get(get_transaction)
                .patch(update_transaction)
                .delete(delete_transaction),
        )
        .route(
            "/api/v1/transactions/:transaction_id/approve",
            post(approve_transaction),
        )
        .route(
            "/api/v1/transactions/:transaction_id/reject",
            post(reject_transaction),
        )
        // Reporting
        .route("/api/v1/summary", get(get_month_summary))
        .route("/api/v1/summary/yearly", get(get_year_summary))
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
