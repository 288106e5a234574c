use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::entities::location;
use crate::services::warehouses::{CreateLocationInput, UpdateLocationInput};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LocationListQuery {
    pub warehouse_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateLocationRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1, max = 16))]
    pub short_code: String,
    pub warehouse_id: Uuid,
}

#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct UpdateLocationRequest {
    pub name: Option<String>,
    pub short_code: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LocationView {
    pub id: Uuid,
    pub name: String,
    pub short_code: String,
    pub warehouse_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<location::Model> for LocationView {
    fn from(model: location::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            short_code: model.short_code,
            warehouse_id: model.warehouse_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/locations",
    params(LocationListQuery),
    responses(
        (status = 200, description = "Locations listed", body = ApiResponse<Vec<LocationView>>)
    ),
    tag = "locations"
)]
pub async fn list_locations(
    State(state): State<AppState>,
    Query(query): Query<LocationListQuery>,
) -> ApiResult<Vec<LocationView>> {
    let locations = state
        .services
        .warehouses
        .list_locations(query.warehouse_id)
        .await?;
    Ok(Json(ApiResponse::success(
        locations.into_iter().map(LocationView::from).collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/locations/:id",
    params(("id" = Uuid, Path, description = "Location ID")),
    responses(
        (status = 200, description = "Location fetched", body = ApiResponse<LocationView>),
        (status = 404, description = "Location not found", body = crate::errors::ErrorResponse)
    ),
    tag = "locations"
)]
pub async fn get_location(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<LocationView> {
    let model = state.services.warehouses.get_location(id).await?;
    Ok(Json(ApiResponse::success(model.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/locations",
    request_body = CreateLocationRequest,
    responses(
        (status = 200, description = "Location created", body = ApiResponse<LocationView>),
        (status = 404, description = "Warehouse not found", body = crate::errors::ErrorResponse)
    ),
    tag = "locations"
)]
pub async fn create_location(
    State(state): State<AppState>,
    Json(payload): Json<CreateLocationRequest>,
) -> ApiResult<LocationView> {
    payload.validate()?;
    let created = state
        .services
        .warehouses
        .create_location(CreateLocationInput {
            name: payload.name,
            short_code: payload.short_code,
            warehouse_id: payload.warehouse_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(created.into())))
}

#[utoipa::path(
    put,
    path = "/api/v1/locations/:id",
    params(("id" = Uuid, Path, description = "Location ID")),
    request_body = UpdateLocationRequest,
    responses(
        (status = 200, description = "Location updated", body = ApiResponse<LocationView>),
        (status = 404, description = "Location not found", body = crate::errors::ErrorResponse)
    ),
    tag = "locations"
)]
pub async fn update_location(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> ApiResult<LocationView> {
    let updated = state
        .services
        .warehouses
        .update_location(
            id,
            UpdateLocationInput {
                name: payload.name,
                short_code: payload.short_code,
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(updated.into())))
}
