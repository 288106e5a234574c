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

use crate::entities::receipt;
use crate::handlers::{acting_user, DocumentListQuery, UpdateStatusRequest};
use crate::services::documents::ItemInput;
use crate::services::receipts::{CreateReceiptInput, ReceiptDetail};
use crate::{ApiResponse, ApiResult, AppState, PaginatedResponse};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReceiptItemRequest {
    pub product_id: Uuid,
    /// Must be positive
    #[schema(example = 10)]
    pub quantity: Decimal,
    /// Purchase cost per unit, optional
    pub unit_cost: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "receive_from": "Acme Components Ltd",
    "warehouse_id": "550e8400-e29b-41d4-a716-446655440000",
    "location_id": "660e8400-e29b-41d4-a716-446655440000",
    "schedule_date": "2025-01-15T09:00:00Z",
    "items": [{"product_id": "770e8400-e29b-41d4-a716-446655440000", "quantity": 25, "unit_cost": "4.80"}]
}))]
pub struct CreateReceiptRequest {
    /// Supplier or counterparty the goods arrive from
    #[validate(length(min = 1))]
    pub receive_from: String,
    pub warehouse_id: Uuid,
    pub location_id: Uuid,
    pub schedule_date: DateTime<Utc>,
    #[validate(length(min = 1))]
    pub items: Vec<ReceiptItemRequest>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReceiptSummary {
    pub id: Uuid,
    /// Document reference, e.g. "WH/IN/0001"
    #[schema(example = "WH/IN/0001")]
    pub reference: String,
    pub receive_from: String,
    pub warehouse_id: Uuid,
    pub location_id: Uuid,
    pub schedule_date: DateTime<Utc>,
    /// Draft, Ready or Done
    pub status: String,
    pub responsible: Uuid,
    pub validated_at: Option<DateTime<Utc>>,
    pub validated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<receipt::Model> for ReceiptSummary {
    fn from(model: receipt::Model) -> Self {
        Self {
            id: model.id,
            reference: model.reference,
            receive_from: model.receive_from,
            warehouse_id: model.warehouse_id,
            location_id: model.location_id,
            schedule_date: model.schedule_date,
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
pub struct ReceiptItemView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: String,
    pub quantity: Decimal,
    pub unit_cost: Option<Decimal>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReceiptDetailView {
    #[serde(flatten)]
    pub receipt: ReceiptSummary,
    pub warehouse_name: String,
    pub location_name: String,
    pub items: Vec<ReceiptItemView>,
}

impl From<ReceiptDetail> for ReceiptDetailView {
    fn from(detail: ReceiptDetail) -> Self {
        Self {
            receipt: detail.receipt.into(),
            warehouse_name: detail.warehouse_name,
            location_name: detail.location_name,
            items: detail
                .items
                .into_iter()
                .map(|i| ReceiptItemView {
                    id: i.item.id,
                    product_id: i.item.product_id,
                    product_name: i.product_name,
                    sku: i.sku,
                    quantity: i.item.quantity,
                    unit_cost: i.item.unit_cost,
                })
                .collect(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/receipts",
    params(DocumentListQuery),
    responses(
        (status = 200, description = "Receipts listed", body = ApiResponse<PaginatedResponse<ReceiptSummary>>)
    ),
    tag = "receipts"
)]
pub async fn list_receipts(
    State(state): State<AppState>,
    Query(query): Query<DocumentListQuery>,
) -> ApiResult<PaginatedResponse<ReceiptSummary>> {
    let filters = query.into_filters()?;
    let page = filters.page;
    let limit = filters.per_page;
    let (records, total) = state.services.receipts.list(filters).await?;

    let items: Vec<ReceiptSummary> = records.into_iter().map(ReceiptSummary::from).collect();
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
    path = "/api/v1/receipts/:id",
    params(("id" = Uuid, Path, description = "Receipt ID")),
    responses(
        (status = 200, description = "Receipt fetched", body = ApiResponse<ReceiptDetailView>),
        (status = 404, description = "Receipt not found", body = crate::errors::ErrorResponse)
    ),
    tag = "receipts"
)]
pub async fn get_receipt(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ReceiptDetailView> {
    let detail = state.services.receipts.get(id).await?;
    Ok(Json(ApiResponse::success(detail.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/receipts",
    request_body = CreateReceiptRequest,
    responses(
        (status = 200, description = "Receipt created in Draft", body = ApiResponse<ReceiptSummary>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Warehouse, location or product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "receipts"
)]
pub async fn create_receipt(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateReceiptRequest>,
) -> ApiResult<ReceiptSummary> {
    payload.validate()?;
    let responsible = acting_user(&headers, state.config.system_user_id)?;

    let input = CreateReceiptInput {
        receive_from: payload.receive_from,
        warehouse_id: payload.warehouse_id,
        location_id: payload.location_id,
        schedule_date: payload.schedule_date,
        items: payload
            .items
            .into_iter()
            .map(|i| ItemInput {
                product_id: i.product_id,
                quantity: i.quantity,
                unit_cost: i.unit_cost,
            })
            .collect(),
    };

    let created = state.services.receipts.create(input, responsible).await?;
    Ok(Json(ApiResponse::success(created.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/receipts/:id/validate",
    params(("id" = Uuid, Path, description = "Receipt ID")),
    responses(
        (status = 200, description = "Receipt validated, stock recorded", body = ApiResponse<ReceiptSummary>),
        (status = 400, description = "Receipt is not Ready", body = crate::errors::ErrorResponse),
        (status = 409, description = "Validated concurrently", body = crate::errors::ErrorResponse)
    ),
    tag = "receipts"
)]
pub async fn validate_receipt(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> ApiResult<ReceiptSummary> {
    let validated_by = acting_user(&headers, state.config.system_user_id)?;
    let updated = state.services.receipts.validate(id, validated_by).await?;
    Ok(Json(ApiResponse::success(updated.into())))
}

#[utoipa::path(
    put,
    path = "/api/v1/receipts/:id/status",
    params(("id" = Uuid, Path, description = "Receipt ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<ReceiptSummary>),
        (status = 400, description = "Transition not allowed", body = crate::errors::ErrorResponse)
    ),
    tag = "receipts"
)]
pub async fn update_receipt_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> ApiResult<ReceiptSummary> {
    let new_status = payload.parse()?;
    let updated = state.services.receipts.set_status(id, new_status).await?;
    Ok(Json(ApiResponse::success(updated.into())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_requires_supplier_and_items() {
        let empty = CreateReceiptRequest {
            receive_from: "".to_string(),
            warehouse_id: Uuid::new_v4(),
            location_id: Uuid::new_v4(),
            schedule_date: Utc::now(),
            items: vec![],
        };
        assert!(empty.validate().is_err());

        let ok = CreateReceiptRequest {
            receive_from: "Acme".to_string(),
            warehouse_id: Uuid::new_v4(),
            location_id: Uuid::new_v4(),
            schedule_date: Utc::now(),
            items: vec![ReceiptItemRequest {
                product_id: Uuid::new_v4(),
                quantity: Decimal::ONE,
                unit_cost: None,
            }],
        };
        assert!(ok.validate().is_ok());
    }
}
