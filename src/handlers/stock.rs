use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::handlers::acting_user;
use crate::services::stock::{StockFilters, StockLevelChange, StockRow};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StockQuery {
    /// Matches product name or SKU, case-insensitive
    pub search: Option<String>,
    pub warehouse_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StockRowView {
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: String,
    pub unit_cost: Decimal,
    pub warehouse_id: Uuid,
    pub warehouse_name: String,
    pub location_id: Uuid,
    pub location_name: String,
    pub on_hand: Decimal,
}

impl From<StockRow> for StockRowView {
    fn from(row: StockRow) -> Self {
        Self {
            product_id: row.product_id,
            product_name: row.product_name,
            sku: row.sku,
            unit_cost: row.unit_cost,
            warehouse_id: row.warehouse_id,
            warehouse_name: row.warehouse_name,
            location_id: row.location_id,
            location_name: row.location_name,
            on_hand: row.on_hand,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetStockLevelRequest {
    /// Absolute target level, must not be negative
    pub quantity: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StockLevelChangeView {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub location_id: Uuid,
    pub previous_quantity: Decimal,
    pub new_quantity: Decimal,
    pub delta: Decimal,
    /// Reference of the Adjustment entry, absent when nothing changed
    pub reference: Option<String>,
}

impl From<StockLevelChange> for StockLevelChangeView {
    fn from(change: StockLevelChange) -> Self {
        Self {
            product_id: change.product_id,
            warehouse_id: change.warehouse_id,
            location_id: change.location_id,
            previous_quantity: change.previous_quantity,
            new_quantity: change.new_quantity,
            delta: change.delta,
            reference: change.reference,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/stock",
    params(StockQuery),
    responses(
        (status = 200, description = "Aggregated stock per product and location", body = ApiResponse<Vec<StockRowView>>)
    ),
    tag = "stock"
)]
pub async fn stock_overview(
    State(state): State<AppState>,
    Query(query): Query<StockQuery>,
) -> ApiResult<Vec<StockRowView>> {
    let rows = state
        .services
        .stock
        .stock_overview(StockFilters {
            search: query.search,
            warehouse_id: query.warehouse_id,
            location_id: query.location_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(
        rows.into_iter().map(StockRowView::from).collect(),
    )))
}

#[utoipa::path(
    put,
    path = "/api/v1/stock/:product_id/:location_id",
    params(
        ("product_id" = Uuid, Path, description = "Product ID"),
        ("location_id" = Uuid, Path, description = "Location ID")
    ),
    request_body = SetStockLevelRequest,
    responses(
        (status = 200, description = "Level set via an Adjustment entry", body = ApiResponse<StockLevelChangeView>),
        (status = 400, description = "Negative target level", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product or location not found", body = crate::errors::ErrorResponse)
    ),
    tag = "stock"
)]
pub async fn set_stock_level(
    State(state): State<AppState>,
    Path((product_id, location_id)): Path<(Uuid, Uuid)>,
    headers: HeaderMap,
    Json(payload): Json<SetStockLevelRequest>,
) -> ApiResult<StockLevelChangeView> {
    let responsible = acting_user(&headers, state.config.system_user_id)?;
    let change = state
        .services
        .stock
        .set_level(product_id, location_id, payload.quantity, responsible)
        .await?;
    Ok(Json(ApiResponse::success(change.into())))
}
