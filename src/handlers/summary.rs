use crate::schemas::{ApiError, ErrorResponse, ApiResponse, AppState, CachedData, engine_error};
use axum::{
    extract::{Query, State},
    response::Json,
};
use common::{FinancialSummaryDto, YearlySummaryDto};
use compute::summary;
use serde::Deserialize;
use tracing::{debug, instrument, trace};
use utoipa::IntoParams;

/// Query parameters for a monthly summary
#[derive(Debug, Deserialize, IntoParams)]
pub struct MonthSummaryQuery {
    /// Calendar month, 1-12
    pub month: u32,
    pub year: i32,
}

/// Query parameters for a yearly summary
#[derive(Debug, Deserialize, IntoParams)]
pub struct YearSummaryQuery {
    pub year: i32,
}

/// Income, expenses and net profit of approved transactions in one month
#[utoipa::path(
    get,
    path = "/api/v1/summary",
    tag = "summary",
    params(MonthSummaryQuery),
    responses(
        (status = 200, description = "Monthly summary", body = ApiResponse<FinancialSummaryDto>),
        (status = 400, description = "Invalid month or year", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_month_summary(
    State(state): State<AppState>,
    Query(query): Query<MonthSummaryQuery>,
) -> Result<Json<ApiResponse<FinancialSummaryDto>>, ApiError> {
    let cache_key = format!("month:{}-{:02}", query.year, query.month);
    if let Some(CachedData::Month(cached)) = state.cache.get(&cache_key).await {
        trace!("Cache hit for {}", cache_key);
        return Ok(Json(ApiResponse::ok(cached, "Summary retrieved from cache")));
    }

    let computed = summary::summarize(&state.db, query.year, query.month, &state.summary_policy)
        .await
        .map_err(engine_error)?
        .to_dto(&state.currency);
    state
        .cache
        .insert(cache_key.clone(), CachedData::Month(computed.clone()))
        .await;
    debug!("Cached {}", cache_key);

    Ok(Json(ApiResponse::ok(computed, "Summary computed successfully")))
}

/// Month-by-month summaries for a year with yearly totals
#[utoipa::path(
    get,
    path = "/api/v1/summary/yearly",
    tag = "summary",
    params(YearSummaryQuery),
    responses(
        (status = 200, description = "Yearly summary", body = ApiResponse<YearlySummaryDto>),
        (status = 400, description = "Invalid year", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_year_summary(
    State(state): State<AppState>,
    Query(query): Query<YearSummaryQuery>,
) -> Result<Json<ApiResponse<YearlySummaryDto>>, ApiError> {
    let cache_key = format!("year:{}", query.year);
    if let Some(CachedData::Year(cached)) = state.cache.get(&cache_key).await {
        trace!("Cache hit for {}", cache_key);
        return Ok(Json(ApiResponse::ok(cached, "Summary retrieved from cache")));
    }

    let computed = summary::summarize_year(&state.db, query.year, &state.summary_policy)
        .await
        .map_err(engine_error)?
        .to_dto(&state.currency);
    state
        .cache
        .insert(cache_key, CachedData::Year(computed.clone()))
        .await;

    Ok(Json(ApiResponse::ok(computed, "Summary computed successfully")))
}
