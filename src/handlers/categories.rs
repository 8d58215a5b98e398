use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use super::{JsonBody, parse_id};
use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{
        CategoryListParams, CategoryListResponse, CategoryPayload, CategoryResponse,
        SuccessResponse,
    },
};

fn not_found() -> AppError {
    AppError::NotFound("Category not found".to_string())
}

/// list_categories
///
/// [Public Route] All categories with translations and product counts. Supports search,
/// sorting by creation date or name, and filtering by whether products are assigned.
#[utoipa::path(
    get,
    path = "/api/categories",
    params(CategoryListParams),
    responses((status = 200, description = "Categories", body = CategoryListResponse))
)]
pub async fn list_categories(
    State(state): State<AppState>,
    Query(params): Query<CategoryListParams>,
) -> AppResult<Json<CategoryListResponse>> {
    let categories = state.repo.list_categories(&params.into_query()).await?;
    Ok(Json(CategoryListResponse { categories }))
}

#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    params(("id" = i32, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Found", body = CategoryResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> AppResult<Json<CategoryResponse>> {
    let id = parse_id(&raw_id, "category")?;
    let category = state.repo.get_category(id).await?.ok_or_else(not_found)?;
    Ok(Json(CategoryResponse { category }))
}

/// create_category
///
/// [Staff Route] Creates a category from at least one translation. Descriptions default
/// to the empty string.
#[utoipa::path(
    post,
    path = "/api/categories",
    request_body = CategoryPayload,
    responses(
        (status = 201, description = "Created", body = CategoryResponse),
        (status = 400, description = "Invalid translations"),
        (status = 403, description = "Not staff")
    )
)]
pub async fn create_category(
    user: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CategoryPayload>,
) -> AppResult<(StatusCode, Json<CategoryResponse>)> {
    user.require_staff()?;
    payload.validate_translations()?;

    let category = state.repo.create_category(payload.translations).await?;
    tracing::info!(category_id = category.id, user_id = user.id, "category created");
    Ok((StatusCode::CREATED, Json(CategoryResponse { category })))
}

/// update_category
///
/// [Staff Route] Replaces the category's translation set atomically.
#[utoipa::path(
    put,
    path = "/api/categories/{id}",
    params(("id" = i32, Path, description = "Category ID")),
    request_body = CategoryPayload,
    responses(
        (status = 200, description = "Updated", body = CategoryResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_category(
    user: AuthUser,
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    JsonBody(payload): JsonBody<CategoryPayload>,
) -> AppResult<Json<CategoryResponse>> {
    user.require_staff()?;
    let id = parse_id(&raw_id, "category")?;
    payload.validate_translations()?;

    let category = state
        .repo
        .update_category(id, payload.translations)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(CategoryResponse { category }))
}

/// delete_category
///
/// [Staff Route] Refused while any product still references the category.
#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    params(("id" = i32, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Deleted", body = SuccessResponse),
        (status = 400, description = "Category still has products"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_category(
    user: AuthUser,
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> AppResult<Json<SuccessResponse>> {
    user.require_staff()?;
    let id = parse_id(&raw_id, "category")?;

    if state.repo.get_category(id).await?.is_none() {
        return Err(not_found());
    }
    if state.repo.count_products_in_category(id).await? > 0 {
        return Err(AppError::Validation(
            "Cannot delete category that has products assigned to it".to_string(),
        ));
    }
    if !state.repo.delete_category(id).await? {
        return Err(not_found());
    }

    tracing::info!(category_id = id, user_id = user.id, "category deleted");
    Ok(Json(SuccessResponse { success: true }))
}
