use axum::{
    extract::{Path, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::warehouse;
use crate::services::warehouses::{CreateWarehouseInput, UpdateWarehouseInput};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateWarehouseRequest {
    #[validate(length(min = 1))]
    pub name: String,
    /// Prefix of every document reference for this warehouse; immutable
    #[validate(length(min = 1, max = 16))]
    pub short_code: String,
    pub address: String,
}

#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct UpdateWarehouseRequest {
    pub name: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WarehouseView {
    pub id: Uuid,
    pub name: String,
    pub short_code: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<warehouse::Model> for WarehouseView {
    fn from(model: warehouse::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            short_code: model.short_code,
            address: model.address,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/warehouses",
    responses(
        (status = 200, description = "Warehouses listed", body = ApiResponse<Vec<WarehouseView>>)
    ),
    tag = "warehouses"
)]
pub async fn list_warehouses(State(state): State<AppState>) -> ApiResult<Vec<WarehouseView>> {
    let warehouses = state.services.warehouses.list().await?;
    Ok(Json(ApiResponse::success(
        warehouses.into_iter().map(WarehouseView::from).collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/warehouses/:id",
    params(("id" = Uuid, Path, description = "Warehouse ID")),
    responses(
        (status = 200, description = "Warehouse fetched", body = ApiResponse<WarehouseView>),
        (status = 404, description = "Warehouse not found", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouses"
)]
pub async fn get_warehouse(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<WarehouseView> {
    let model = state.services.warehouses.get(id).await?;
    Ok(Json(ApiResponse::success(model.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/warehouses",
    request_body = CreateWarehouseRequest,
    responses(
        (status = 200, description = "Warehouse created", body = ApiResponse<WarehouseView>),
        (status = 409, description = "Short code already in use", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouses"
)]
pub async fn create_warehouse(
    State(state): State<AppState>,
    Json(payload): Json<CreateWarehouseRequest>,
) -> ApiResult<WarehouseView> {
    payload.validate()?;
    let created = state
        .services
        .warehouses
        .create(CreateWarehouseInput {
            name: payload.name,
            short_code: payload.short_code,
            address: payload.address,
        })
        .await?;
    Ok(Json(ApiResponse::success(created.into())))
}

#[utoipa::path(
    put,
    path = "/api/v1/warehouses/:id",
    params(("id" = Uuid, Path, description = "Warehouse ID")),
    request_body = UpdateWarehouseRequest,
    responses(
        (status = 200, description = "Warehouse updated", body = ApiResponse<WarehouseView>),
        (status = 404, description = "Warehouse not found", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouses"
)]
pub async fn update_warehouse(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateWarehouseRequest>,
) -> ApiResult<WarehouseView> {
    let updated = state
        .services
        .warehouses
        .update(
            id,
            UpdateWarehouseInput {
                name: payload.name,
                address: payload.address,
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(updated.into())))
}
