use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::handlers::stock::StockRowView;
use crate::services::dashboard::{DashboardStats, PendingOperation};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PendingOperationsQuery {
    /// Maximum rows returned, default 20
    pub limit: Option<usize>,
}

#[utoipa::path(
    get,
    path = "/api/v1/dashboard/stats",
    responses(
        (status = 200, description = "Headline counters", body = ApiResponse<DashboardStats>)
    ),
    tag = "dashboard"
)]
pub async fn stats(State(state): State<AppState>) -> ApiResult<DashboardStats> {
    let stats = state.services.dashboard.stats().await?;
    Ok(Json(ApiResponse::success(stats)))
}

#[utoipa::path(
    get,
    path = "/api/v1/dashboard/pending-operations",
    params(PendingOperationsQuery),
    responses(
        (status = 200, description = "Documents not yet Done, earliest scheduled first", body = ApiResponse<Vec<PendingOperation>>)
    ),
    tag = "dashboard"
)]
pub async fn pending_operations(
    State(state): State<AppState>,
    Query(query): Query<PendingOperationsQuery>,
) -> ApiResult<Vec<PendingOperation>> {
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let operations = state.services.dashboard.pending_operations(limit).await?;
    Ok(Json(ApiResponse::success(operations)))
}

#[utoipa::path(
    get,
    path = "/api/v1/dashboard/low-stock",
    responses(
        (status = 200, description = "Stock rows below the configured threshold", body = ApiResponse<Vec<StockRowView>>)
    ),
    tag = "dashboard"
)]
pub async fn low_stock(State(state): State<AppState>) -> ApiResult<Vec<StockRowView>> {
    let rows = state.services.dashboard.low_stock().await?;
    Ok(Json(ApiResponse::success(
        rows.into_iter().map(StockRowView::from).collect(),
    )))
}
