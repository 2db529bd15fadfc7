use crate::handlers::{parse_enum, parse_optional_enum};
use crate::schemas::{ApiError, ErrorResponse, ApiResponse, AppState, engine_error};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use compute::ledger::{self, NewCategory};
use model::entities::account_category::{self, EntryType};
use sea_orm::ActiveEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Request structure for creating a new category
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateCategoryRequest {
    /// The name of the category (unique, case-insensitive)
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// income or expense
    pub category_type: String,
    /// Optional description of what the category is for
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

/// Response structure for category operations
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponse {
    pub id: i32,
    pub name: String,
    pub category_type: String,
    pub description: Option<String>,
}

impl From<account_category::Model> for CategoryResponse {
    fn from(model: account_category::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            category_type: model.category_type.to_value(),
            description: model.description,
        }
    }
}

/// Query parameters for listing categories
#[derive(Debug, Deserialize, IntoParams)]
pub struct CategoryQuery {
    /// income or expense
    pub category_type: Option<String>,
}

/// Create a new category
#[utoipa::path(
    post,
    path = "/api/v1/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created successfully", body = ApiResponse<CategoryResponse>),
        (status = 400, description = "Invalid request data", body = ErrorResponse),
        (status = 409, description = "Category name already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "categories"
)]
#[instrument(skip(state))]
pub async fn create_category(
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<CreateCategoryRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<CategoryResponse>>), ApiError> {
    debug!("Creating category with name: {}", request.name);
    let category_type = parse_enum::<EntryType>("category type", &request.category_type)?;

    let category = ledger::create_category(
        &state.db,
        NewCategory {
            name: request.name,
            category_type,
            description: request.description,
        },
    )
    .await
    .map_err(engine_error)?;

    // A new category can change which rows count as payroll or advances.
    state.invalidate_summaries();
    info!("Category created successfully with ID: {}", category.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            CategoryResponse::from(category),
            "Category created successfully",
        )),
    ))
}

/// List categories
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    params(CategoryQuery),
    responses(
        (status = 200, description = "Categories retrieved successfully", body = ApiResponse<Vec<CategoryResponse>>),
        (status = 400, description = "Unknown category type", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "categories"
)]
#[instrument(skip(state))]
pub async fn get_categories(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> Result<Json<ApiResponse<Vec<CategoryResponse>>>, ApiError> {
    let category_type =
        parse_optional_enum::<EntryType>("category type", query.category_type.as_deref())?;
    let categories = ledger::list_categories(&state.db, category_type)
        .await
        .map_err(engine_error)?;
    debug!("Retrieved {} categories", categories.len());

    Ok(Json(ApiResponse::ok(
        categories.into_iter().map(CategoryResponse::from).collect(),
        "Categories retrieved successfully",
    )))
}
