use axum::{Json, extract::State, http::StatusCode};
use validator::Validate;

use super::JsonBody;
use crate::{
    AppState,
    auth::AuthUser,
    error::AppResult,
    models::{CreateSupplierRequest, Plan, Supplier},
};

#[utoipa::path(
    get,
    path = "/api/suppliers",
    responses((status = 200, description = "Suppliers", body = [Supplier]))
)]
pub async fn list_suppliers(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Supplier>>> {
    user.require_staff()?;
    Ok(Json(state.repo.list_suppliers().await?))
}

/// create_supplier
///
/// [Staff Route] Registers a supplier that product supplier links can point at.
#[utoipa::path(
    post,
    path = "/api/suppliers",
    request_body = CreateSupplierRequest,
    responses(
        (status = 201, description = "Created", body = Supplier),
        (status = 400, description = "Validation failed")
    )
)]
pub async fn create_supplier(
    user: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateSupplierRequest>,
) -> AppResult<(StatusCode, Json<Supplier>)> {
    user.require_staff()?;
    payload.validate()?;

    let supplier = state.repo.create_supplier(payload).await?;
    tracing::info!(supplier_id = supplier.id, user_id = user.id, "supplier created");
    Ok((StatusCode::CREATED, Json(supplier)))
}

/// list_plans
///
/// [Public Route] Active subscription plans, cheapest first.
#[utoipa::path(
    get,
    path = "/api/plans",
    responses((status = 200, description = "Plans", body = [Plan]))
)]
pub async fn list_plans(State(state): State<AppState>) -> AppResult<Json<Vec<Plan>>> {
    Ok(Json(state.repo.list_active_plans().await?))
}
