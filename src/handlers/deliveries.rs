use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::delivery;
use crate::handlers::{acting_user, DocumentListQuery, UpdateStatusRequest};
use crate::services::deliveries::{CreateDeliveryInput, DeliveryDetail};
use crate::services::documents::ItemInput;
use crate::{ApiResponse, ApiResult, AppState, PaginatedResponse};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeliveryItemRequest {
    pub product_id: Uuid,
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateDeliveryRequest {
    /// Destination address for the goods
    #[validate(length(min = 1))]
    pub delivery_address: String,
    pub warehouse_id: Uuid,
    pub location_id: Uuid,
    pub schedule_date: DateTime<Utc>,
    /// Free-form operation label, e.g. "standard" or "express"
    pub operation_type: Option<String>,
    #[validate(length(min = 1))]
    pub items: Vec<DeliveryItemRequest>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeliverySummary {
    pub id: Uuid,
    /// Document reference, e.g. "WH/OUT/0001"
    pub reference: String,
    pub delivery_address: String,
    pub warehouse_id: Uuid,
    pub location_id: Uuid,
    pub schedule_date: DateTime<Utc>,
    pub operation_type: Option<String>,
    /// Draft, Waiting, Ready or Done
    pub status: String,
    pub responsible: Uuid,
    pub validated_at: Option<DateTime<Utc>>,
    pub validated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<delivery::Model> for DeliverySummary {
    fn from(model: delivery::Model) -> Self {
        Self {
            id: model.id,
            reference: model.reference,
            delivery_address: model.delivery_address,
            warehouse_id: model.warehouse_id,
            location_id: model.location_id,
            schedule_date: model.schedule_date,
            operation_type: model.operation_type,
            status: model.status,
            responsible: model.responsible,
            validated_at: model.validated_at,
            validated_by: model.validated_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeliveryItemView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: String,
    pub quantity: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeliveryDetailView {
    #[serde(flatten)]
    pub delivery: DeliverySummary,
    pub warehouse_name: String,
    pub location_name: String,
    pub items: Vec<DeliveryItemView>,
}

impl From<DeliveryDetail> for DeliveryDetailView {
    fn from(detail: DeliveryDetail) -> Self {
        Self {
            delivery: detail.delivery.into(),
            warehouse_name: detail.warehouse_name,
            location_name: detail.location_name,
            items: detail
                .items
                .into_iter()
                .map(|i| DeliveryItemView {
                    id: i.item.id,
                    product_id: i.item.product_id,
                    product_name: i.product_name,
                    sku: i.sku,
                    quantity: i.item.quantity,
                })
                .collect(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/deliveries",
    params(DocumentListQuery),
    responses(
        (status = 200, description = "Deliveries listed", body = ApiResponse<PaginatedResponse<DeliverySummary>>)
    ),
    tag = "deliveries"
)]
pub async fn list_deliveries(
    State(state): State<AppState>,
    Query(query): Query<DocumentListQuery>,
) -> ApiResult<PaginatedResponse<DeliverySummary>> {
    let filters = query.into_filters()?;
    let page = filters.page;
    let limit = filters.per_page;
    let (records, total) = state.services.deliveries.list(filters).await?;

    let items: Vec<DeliverySummary> = records.into_iter().map(DeliverySummary::from).collect();
    let total_pages = (total + limit - 1) / limit;

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items,
        total,
        page,
        limit,
        total_pages,
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/deliveries/:id",
    params(("id" = Uuid, Path, description = "Delivery ID")),
    responses(
        (status = 200, description = "Delivery fetched", body = ApiResponse<DeliveryDetailView>),
        (status = 404, description = "Delivery not found", body = crate::errors::ErrorResponse)
    ),
    tag = "deliveries"
)]
pub async fn get_delivery(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<DeliveryDetailView> {
    let detail = state.services.deliveries.get(id).await?;
    Ok(Json(ApiResponse::success(detail.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/deliveries",
    request_body = CreateDeliveryRequest,
    responses(
        (status = 200, description = "Delivery created in Draft", body = ApiResponse<DeliverySummary>),
        (status = 404, description = "Warehouse, location or product not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock, itemized in details", body = crate::errors::ErrorResponse)
    ),
    tag = "deliveries"
)]
pub async fn create_delivery(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateDeliveryRequest>,
) -> ApiResult<DeliverySummary> {
    payload.validate()?;
    let responsible = acting_user(&headers, state.config.system_user_id)?;

    let input = CreateDeliveryInput {
        delivery_address: payload.delivery_address,
        warehouse_id: payload.warehouse_id,
        location_id: payload.location_id,
        schedule_date: payload.schedule_date,
        operation_type: payload.operation_type,
        items: payload
            .items
            .into_iter()
            .map(|i| ItemInput {
                product_id: i.product_id,
                quantity: i.quantity,
                unit_cost: None,
            })
            .collect(),
    };

    let created = state.services.deliveries.create(input, responsible).await?;
    Ok(Json(ApiResponse::success(created.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/deliveries/:id/validate",
    params(("id" = Uuid, Path, description = "Delivery ID")),
    responses(
        (status = 200, description = "Delivery validated, stock deducted", body = ApiResponse<DeliverySummary>),
        (status = 400, description = "Delivery is not Ready", body = crate::errors::ErrorResponse),
        (status = 409, description = "Validated concurrently", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock, itemized in details", body = crate::errors::ErrorResponse)
    ),
    tag = "deliveries"
)]
pub async fn validate_delivery(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> ApiResult<DeliverySummary> {
    let validated_by = acting_user(&headers, state.config.system_user_id)?;
    let updated = state.services.deliveries.validate(id, validated_by).await?;
    Ok(Json(ApiResponse::success(updated.into())))
}

#[utoipa::path(
    put,
    path = "/api/v1/deliveries/:id/status",
    params(("id" = Uuid, Path, description = "Delivery ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<DeliverySummary>),
        (status = 400, description = "Transition not allowed", body = crate::errors::ErrorResponse)
    ),
    tag = "deliveries"
)]
pub async fn update_delivery_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> ApiResult<DeliverySummary> {
    let new_status = payload.parse()?;
    let updated = state.services.deliveries.set_status(id, new_status).await?;
    Ok(Json(ApiResponse::success(updated.into())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_requires_address_and_items() {
        let empty = CreateDeliveryRequest {
            delivery_address: "".to_string(),
            warehouse_id: Uuid::new_v4(),
            location_id: Uuid::new_v4(),
            schedule_date: Utc::now(),
            operation_type: None,
            items: vec![],
        };
        assert!(empty.validate().is_err());

        let ok = CreateDeliveryRequest {
            delivery_address: "12 Customer Lane".to_string(),
            warehouse_id: Uuid::new_v4(),
            location_id: Uuid::new_v4(),
            schedule_date: Utc::now(),
            operation_type: Some("express".to_string()),
            items: vec![DeliveryItemRequest {
                product_id: Uuid::new_v4(),
                quantity: Decimal::ONE,
            }],
        };
        assert!(ok.validate().is_ok());
    }
}
