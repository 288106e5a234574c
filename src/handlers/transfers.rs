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

use crate::entities::transfer;
use crate::handlers::{acting_user, DocumentListQuery, UpdateStatusRequest};
use crate::services::documents::ItemInput;
use crate::services::transfers::{CreateTransferInput, TransferDetail};
use crate::{ApiResponse, ApiResult, AppState, PaginatedResponse};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransferItemRequest {
    pub product_id: Uuid,
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTransferRequest {
    pub from_warehouse_id: Uuid,
    pub from_location_id: Uuid,
    pub to_warehouse_id: Uuid,
    pub to_location_id: Uuid,
    pub schedule_date: DateTime<Utc>,
    pub notes: Option<String>,
    #[validate(length(min = 1))]
    pub items: Vec<TransferItemRequest>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransferSummary {
    pub id: Uuid,
    /// Document reference, e.g. "WH/TR/0001"; carries the source warehouse code
    pub reference: String,
    pub from_warehouse_id: Uuid,
    pub from_location_id: Uuid,
    pub to_warehouse_id: Uuid,
    pub to_location_id: Uuid,
    pub schedule_date: DateTime<Utc>,
    /// Draft, Ready or Done
    pub status: String,
    pub responsible: Uuid,
    pub validated_at: Option<DateTime<Utc>>,
    pub validated_by: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<transfer::Model> for TransferSummary {
    fn from(model: transfer::Model) -> Self {
        Self {
            id: model.id,
            reference: model.reference,
            from_warehouse_id: model.from_warehouse_id,
            from_location_id: model.from_location_id,
            to_warehouse_id: model.to_warehouse_id,
            to_location_id: model.to_location_id,
            schedule_date: model.schedule_date,
            status: model.status,
            responsible: model.responsible,
            validated_at: model.validated_at,
            validated_by: model.validated_by,
            notes: model.notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransferItemView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: String,
    pub quantity: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransferDetailView {
    #[serde(flatten)]
    pub transfer: TransferSummary,
    pub from_warehouse_name: String,
    pub from_location_name: String,
    pub to_warehouse_name: String,
    pub to_location_name: String,
    pub items: Vec<TransferItemView>,
}

impl From<TransferDetail> for TransferDetailView {
    fn from(detail: TransferDetail) -> Self {
        Self {
            transfer: detail.transfer.into(),
            from_warehouse_name: detail.from_warehouse_name,
            from_location_name: detail.from_location_name,
            to_warehouse_name: detail.to_warehouse_name,
            to_location_name: detail.to_location_name,
            items: detail
                .items
                .into_iter()
                .map(|i| TransferItemView {
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
    path = "/api/v1/transfers",
    params(DocumentListQuery),
    responses(
        (status = 200, description = "Transfers listed", body = ApiResponse<PaginatedResponse<TransferSummary>>)
    ),
    tag = "transfers"
)]
pub async fn list_transfers(
    State(state): State<AppState>,
    Query(query): Query<DocumentListQuery>,
) -> ApiResult<PaginatedResponse<TransferSummary>> {
    let filters = query.into_filters()?;
    let page = filters.page;
    let limit = filters.per_page;
    let (records, total) = state.services.transfers.list(filters).await?;

    let items: Vec<TransferSummary> = records.into_iter().map(TransferSummary::from).collect();
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
    path = "/api/v1/transfers/:id",
    params(("id" = Uuid, Path, description = "Transfer ID")),
    responses(
        (status = 200, description = "Transfer fetched", body = ApiResponse<TransferDetailView>),
        (status = 404, description = "Transfer not found", body = crate::errors::ErrorResponse)
    ),
    tag = "transfers"
)]
pub async fn get_transfer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<TransferDetailView> {
    let detail = state.services.transfers.get(id).await?;
    Ok(Json(ApiResponse::success(detail.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/transfers",
    request_body = CreateTransferRequest,
    responses(
        (status = 200, description = "Transfer created in Draft", body = ApiResponse<TransferSummary>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock at source, itemized in details", body = crate::errors::ErrorResponse)
    ),
    tag = "transfers"
)]
pub async fn create_transfer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateTransferRequest>,
) -> ApiResult<TransferSummary> {
    payload.validate()?;
    let responsible = acting_user(&headers, state.config.system_user_id)?;

    let input = CreateTransferInput {
        from_warehouse_id: payload.from_warehouse_id,
        from_location_id: payload.from_location_id,
        to_warehouse_id: payload.to_warehouse_id,
        to_location_id: payload.to_location_id,
        schedule_date: payload.schedule_date,
        notes: payload.notes,
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

    let created = state.services.transfers.create(input, responsible).await?;
    Ok(Json(ApiResponse::success(created.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/transfers/:id/validate",
    params(("id" = Uuid, Path, description = "Transfer ID")),
    responses(
        (status = 200, description = "Transfer validated, stock moved", body = ApiResponse<TransferSummary>),
        (status = 400, description = "Transfer is already Done", body = crate::errors::ErrorResponse),
        (status = 409, description = "Validated concurrently", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock at source, itemized in details", body = crate::errors::ErrorResponse)
    ),
    tag = "transfers"
)]
pub async fn validate_transfer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> ApiResult<TransferSummary> {
    let validated_by = acting_user(&headers, state.config.system_user_id)?;
    let updated = state.services.transfers.validate(id, validated_by).await?;
    Ok(Json(ApiResponse::success(updated.into())))
}

#[utoipa::path(
    put,
    path = "/api/v1/transfers/:id/status",
    params(("id" = Uuid, Path, description = "Transfer ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<TransferSummary>),
        (status = 400, description = "Transition not allowed", body = crate::errors::ErrorResponse)
    ),
    tag = "transfers"
)]
pub async fn update_transfer_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> ApiResult<TransferSummary> {
    let new_status = payload.parse()?;
    let updated = state.services.transfers.set_status(id, new_status).await?;
    Ok(Json(ApiResponse::success(updated.into())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_requires_items() {
        let empty = CreateTransferRequest {
            from_warehouse_id: Uuid::new_v4(),
            from_location_id: Uuid::new_v4(),
            to_warehouse_id: Uuid::new_v4(),
            to_location_id: Uuid::new_v4(),
            schedule_date: Utc::now(),
            notes: None,
            items: vec![],
        };
        assert!(empty.validate().is_err());

        let ok = CreateTransferRequest {
            from_warehouse_id: Uuid::new_v4(),
            from_location_id: Uuid::new_v4(),
            to_warehouse_id: Uuid::new_v4(),
            to_location_id: Uuid::new_v4(),
            schedule_date: Utc::now(),
            notes: None,
            items: vec![TransferItemRequest {
                product_id: Uuid::new_v4(),
                quantity: Decimal::ONE,
            }],
        };
        assert!(ok.validate().is_ok());
    }
}
