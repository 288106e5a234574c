use std::sync::Arc;

use axum::http::HeaderMap;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::errors::ServiceError;
use crate::events::EventSender;
use crate::services::dashboard::DashboardService;
use crate::services::deliveries::DeliveryService;
use crate::services::documents::{DocumentFilters, DocumentStatus};
use crate::services::products::ProductService;
use crate::services::receipts::ReceiptService;
use crate::services::stock::StockService;
use crate::services::transfers::TransferService;
use crate::services::warehouses::WarehouseService;

pub mod dashboard;
pub mod deliveries;
pub mod locations;
pub mod movements;
pub mod products;
pub mod receipts;
pub mod stock;
pub mod transfers;
pub mod warehouses;

/// Container for all application services, shared through `AppState`.
#[derive(Clone)]
pub struct AppServices {
    pub receipts: ReceiptService,
    pub deliveries: DeliveryService,
    pub transfers: TransferService,
    pub stock: StockService,
    pub products: ProductService,
    pub warehouses: WarehouseService,
    pub dashboard: DashboardService,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender, config: &AppConfig) -> Self {
        let stock = StockService::new(db_pool.clone(), event_sender.clone());
        Self {
            receipts: ReceiptService::new(db_pool.clone(), event_sender.clone()),
            deliveries: DeliveryService::new(
                db_pool.clone(),
                event_sender.clone(),
                config.low_stock_threshold,
            ),
            transfers: TransferService::new(db_pool.clone(), event_sender),
            products: ProductService::new(db_pool.clone()),
            warehouses: WarehouseService::new(db_pool.clone()),
            dashboard: DashboardService::new(
                db_pool,
                stock.clone(),
                config.low_stock_threshold,
            ),
            stock,
        }
    }
}

/// Resolves the acting user from the X-User-Id header, falling back to the
/// configured system user when the header is absent. A malformed header is
/// rejected rather than silently replaced.
pub fn acting_user(headers: &HeaderMap, fallback: Uuid) -> Result<Uuid, ServiceError> {
    match headers.get("x-user-id") {
        None => Ok(fallback),
        Some(value) => {
            let raw = value.to_str().map_err(|_| {
                ServiceError::ValidationError("X-User-Id header is not valid ASCII".to_string())
            })?;
            Uuid::parse_str(raw).map_err(|_| {
                ServiceError::ValidationError(format!("X-User-Id is not a valid UUID: {raw}"))
            })
        }
    }
}

/// Common query parameters for the three document list endpoints.
#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DocumentListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Draft, Waiting, Ready or Done
    pub status: Option<String>,
    pub warehouse_id: Option<Uuid>,
    pub search: Option<String>,
}

impl DocumentListQuery {
    pub fn into_filters(self) -> Result<DocumentFilters, ServiceError> {
        let status = self
            .status
            .map(|s| {
                s.parse::<DocumentStatus>().map_err(|_| {
                    ServiceError::ValidationError(format!("unknown status filter: {s}"))
                })
            })
            .transpose()?;
        Ok(DocumentFilters {
            status,
            warehouse_id: self.warehouse_id,
            search: self.search,
            page: self.page.unwrap_or(1).max(1),
            per_page: self.limit.unwrap_or(20).clamp(1, 100),
        })
    }
}

/// Body of `PUT /{resource}/{id}/status`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    /// Target status; only forward moves are accepted and Done is reserved
    /// for the validate endpoint
    pub status: String,
}

impl UpdateStatusRequest {
    pub fn parse(&self) -> Result<DocumentStatus, ServiceError> {
        self.status.parse::<DocumentStatus>().map_err(|_| {
            ServiceError::ValidationError(format!("unknown status: {}", self.status))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn acting_user_falls_back_to_system_user() {
        let fallback = Uuid::new_v4();
        let headers = HeaderMap::new();
        assert_eq!(acting_user(&headers, fallback).unwrap(), fallback);
    }

    #[test]
    fn acting_user_reads_the_header() {
        let user = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_str(&user.to_string()).unwrap());
        assert_eq!(acting_user(&headers, Uuid::new_v4()).unwrap(), user);
    }

    #[test]
    fn malformed_header_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_static("not-a-uuid"));
        assert!(matches!(
            acting_user(&headers, Uuid::new_v4()),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn status_filter_parses_or_rejects() {
        let query = DocumentListQuery {
            status: Some("Ready".to_string()),
            ..Default::default()
        };
        let filters = query.into_filters().unwrap();
        assert_eq!(filters.status, Some(DocumentStatus::Ready));
        assert_eq!(filters.page, 1);

        let bad = DocumentListQuery {
            status: Some("Shipped".to_string()),
            ..Default::default()
        };
        assert!(bad.into_filters().is_err());
    }
}
