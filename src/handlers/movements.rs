use axum::{
    extract::{Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::services::documents::TransactionType;
use crate::services::stock::{MovementFilters, MovementRow};
use crate::{ApiResponse, ApiResult, AppState, PaginatedResponse};

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MovementQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub product_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    /// Receipt, Delivery, Transfer or Adjustment
    pub transaction_type: Option<String>,
    /// Substring match on the document reference
    pub reference: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MovementView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: String,
    pub warehouse_id: Uuid,
    pub warehouse_name: String,
    pub location_id: Uuid,
    pub location_name: String,
    /// Signed quantity: positive into the location, negative out
    pub quantity: Decimal,
    pub transaction_type: String,
    pub reference: String,
    /// Supplier or delivery address of the owning document, when any
    pub counterparty: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<MovementRow> for MovementView {
    fn from(row: MovementRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            product_name: row.product_name,
            sku: row.sku,
            warehouse_id: row.warehouse_id,
            warehouse_name: row.warehouse_name,
            location_id: row.location_id,
            location_name: row.location_name,
            quantity: row.quantity,
            transaction_type: row.transaction_type,
            reference: row.reference,
            counterparty: row.counterparty,
            created_at: row.created_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/movements",
    params(MovementQuery),
    responses(
        (status = 200, description = "Ledger history, newest first", body = ApiResponse<PaginatedResponse<MovementView>>)
    ),
    tag = "movements"
)]
pub async fn list_movements(
    State(state): State<AppState>,
    Query(query): Query<MovementQuery>,
) -> ApiResult<PaginatedResponse<MovementView>> {
    let transaction_type = query
        .transaction_type
        .map(|t| {
            t.parse::<TransactionType>().map_err(|_| {
                ServiceError::ValidationError(format!("unknown transaction type: {t}"))
            })
        })
        .transpose()?;

    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);

    let (rows, total) = state
        .services
        .stock
        .movements(MovementFilters {
            product_id: query.product_id,
            location_id: query.location_id,
            warehouse_id: query.warehouse_id,
            transaction_type,
            reference: query.reference,
            page,
            per_page: limit,
        })
        .await?;

    let items: Vec<MovementView> = rows.into_iter().map(MovementView::from).collect();
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
    path = "/api/v1/movements/transaction-types",
    responses(
        (status = 200, description = "All ledger entry categories", body = ApiResponse<Vec<String>>)
    ),
    tag = "movements"
)]
pub async fn transaction_types() -> ApiResult<Vec<String>> {
    let types: Vec<String> = TransactionType::iter().map(|t| t.to_string()).collect();
    Ok(Json(ApiResponse::success(types)))
}
