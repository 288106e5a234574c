//! Warehouse inventory API library
//!
//! Stock is tracked as an append-only ledger of signed movements; on-hand
//! quantities are always sums over it. Receipts, deliveries and transfers
//! move stock through a Draft → Ready → Done lifecycle.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod services;

use axum::{
    extract::State,
    response::Json,
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<config::AppConfig>,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: Arc<config::AppConfig>,
        event_sender: events::EventSender,
    ) -> Self {
        let services = handlers::AppServices::new(db.clone(), event_sender.clone(), &config);
        Self {
            db,
            config,
            event_sender,
            services,
        }
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

pub fn api_v1_routes() -> Router<AppState> {
    let products = Router::new()
        .route(
            "/products",
            get(handlers::products::list_products).post(handlers::products::create_product),
        )
        .route(
            "/products/:id",
            get(handlers::products::get_product).put(handlers::products::update_product),
        )
        .route(
            "/product-categories",
            get(handlers::products::list_categories).post(handlers::products::create_category),
        );

    let warehouses = Router::new()
        .route(
            "/warehouses",
            get(handlers::warehouses::list_warehouses).post(handlers::warehouses::create_warehouse),
        )
        .route(
            "/warehouses/:id",
            get(handlers::warehouses::get_warehouse).put(handlers::warehouses::update_warehouse),
        )
        .route(
            "/locations",
            get(handlers::locations::list_locations).post(handlers::locations::create_location),
        )
        .route(
            "/locations/:id",
            get(handlers::locations::get_location).put(handlers::locations::update_location),
        );

    let receipts = Router::new()
        .route(
            "/receipts",
            get(handlers::receipts::list_receipts).post(handlers::receipts::create_receipt),
        )
        .route("/receipts/:id", get(handlers::receipts::get_receipt))
        .route(
            "/receipts/:id/validate",
            post(handlers::receipts::validate_receipt),
        )
        .route(
            "/receipts/:id/status",
            put(handlers::receipts::update_receipt_status),
        );

    let deliveries = Router::new()
        .route(
            "/deliveries",
            get(handlers::deliveries::list_deliveries).post(handlers::deliveries::create_delivery),
        )
        .route("/deliveries/:id", get(handlers::deliveries::get_delivery))
        .route(
            "/deliveries/:id/validate",
            post(handlers::deliveries::validate_delivery),
        )
        .route(
            "/deliveries/:id/status",
            put(handlers::deliveries::update_delivery_status),
        );

    let transfers = Router::new()
        .route(
            "/transfers",
            get(handlers::transfers::list_transfers).post(handlers::transfers::create_transfer),
        )
        .route("/transfers/:id", get(handlers::transfers::get_transfer))
        .route(
            "/transfers/:id/validate",
            post(handlers::transfers::validate_transfer),
        )
        .route(
            "/transfers/:id/status",
            put(handlers::transfers::update_transfer_status),
        );

    let stock = Router::new()
        .route("/stock", get(handlers::stock::stock_overview))
        .route(
            "/stock/:product_id/:location_id",
            put(handlers::stock::set_stock_level),
        )
        .route("/movements", get(handlers::movements::list_movements))
        .route(
            "/movements/transaction-types",
            get(handlers::movements::transaction_types),
        );

    let dashboard = Router::new()
        .route("/dashboard/stats", get(handlers::dashboard::stats))
        .route(
            "/dashboard/pending-operations",
            get(handlers::dashboard::pending_operations),
        )
        .route("/dashboard/low-stock", get(handlers::dashboard::low_stock));

    Router::new()
        .merge(products)
        .merge(warehouses)
        .merge(receipts)
        .merge(deliveries)
        .merge(transfers)
        .merge(stock)
        .merge(dashboard)
}

pub async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let version = env!("CARGO_PKG_VERSION");
    let status_data = json!({
        "status": "ok",
        "version": version,
        "service": "warehouse-api",
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}

#[cfg(test)]
mod response_tests {
    use super::*;

    #[test]
    fn success_response_carries_data() {
        let response = ApiResponse::success(42);
        assert!(response.success);
        assert_eq!(response.data, Some(42));
        assert!(response.message.is_none());
    }

    #[test]
    fn error_response_carries_message() {
        let response = ApiResponse::<()>::error("oops".into());
        assert!(!response.success);
        assert!(response.data.is_none());
        assert_eq!(response.message.as_deref(), Some("oops"));
    }
}
