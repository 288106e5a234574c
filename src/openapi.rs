use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Warehouse Inventory API",
        version = "1.0.0",
        description = r#"
Inventory backend built around an append-only stock ledger.

- **Stock ledger**: every movement is a signed, immutable entry; on-hand
  quantities are sums over the ledger per (product, location).
- **Documents**: receipts (inbound), deliveries (outbound) and transfers
  move stock when validated, following Draft → [Waiting] → Ready → Done.
- **References**: allocated serially per warehouse and kind, e.g.
  `WH/IN/0001`, `WH/OUT/0002`, `WH/TR/0003`.
- **Availability**: outbound documents are checked at creation and again
  at validation; shortages are reported per product.

Requests may carry an `X-User-Id` header identifying the acting user;
without it, actions are attributed to the configured system user.
        "#
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "products", description = "Product catalog"),
        (name = "warehouses", description = "Warehouses and locations"),
        (name = "locations", description = "Storage locations"),
        (name = "receipts", description = "Inbound stock documents"),
        (name = "deliveries", description = "Outbound stock documents"),
        (name = "transfers", description = "Inter-location stock documents"),
        (name = "stock", description = "Aggregated stock and manual adjustments"),
        (name = "movements", description = "Ledger history"),
        (name = "dashboard", description = "Aggregated read models")
    ),
    paths(
        handlers::products::list_products,
        handlers::products::get_product,
        handlers::products::create_product,
        handlers::products::update_product,
        handlers::products::list_categories,
        handlers::products::create_category,
        handlers::warehouses::list_warehouses,
        handlers::warehouses::get_warehouse,
        handlers::warehouses::create_warehouse,
        handlers::warehouses::update_warehouse,
        handlers::locations::list_locations,
        handlers::locations::get_location,
        handlers::locations::create_location,
        handlers::locations::update_location,
        handlers::receipts::list_receipts,
        handlers::receipts::get_receipt,
        handlers::receipts::create_receipt,
        handlers::receipts::validate_receipt,
        handlers::receipts::update_receipt_status,
        handlers::deliveries::list_deliveries,
        handlers::deliveries::get_delivery,
        handlers::deliveries::create_delivery,
        handlers::deliveries::validate_delivery,
        handlers::deliveries::update_delivery_status,
        handlers::transfers::list_transfers,
        handlers::transfers::get_transfer,
        handlers::transfers::create_transfer,
        handlers::transfers::validate_transfer,
        handlers::transfers::update_transfer_status,
        handlers::stock::stock_overview,
        handlers::stock::set_stock_level,
        handlers::movements::list_movements,
        handlers::movements::transaction_types,
        handlers::dashboard::stats,
        handlers::dashboard::pending_operations,
        handlers::dashboard::low_stock,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        handlers::UpdateStatusRequest,
        handlers::products::CreateProductRequest,
        handlers::products::UpdateProductRequest,
        handlers::products::ProductView,
        handlers::products::CreateCategoryRequest,
        handlers::products::CategoryView,
        handlers::warehouses::CreateWarehouseRequest,
        handlers::warehouses::UpdateWarehouseRequest,
        handlers::warehouses::WarehouseView,
        handlers::locations::CreateLocationRequest,
        handlers::locations::UpdateLocationRequest,
        handlers::locations::LocationView,
        handlers::receipts::CreateReceiptRequest,
        handlers::receipts::ReceiptItemRequest,
        handlers::receipts::ReceiptSummary,
        handlers::receipts::ReceiptItemView,
        handlers::receipts::ReceiptDetailView,
        handlers::deliveries::CreateDeliveryRequest,
        handlers::deliveries::DeliveryItemRequest,
        handlers::deliveries::DeliverySummary,
        handlers::deliveries::DeliveryItemView,
        handlers::deliveries::DeliveryDetailView,
        handlers::transfers::CreateTransferRequest,
        handlers::transfers::TransferItemRequest,
        handlers::transfers::TransferSummary,
        handlers::transfers::TransferItemView,
        handlers::transfers::TransferDetailView,
        handlers::stock::StockRowView,
        handlers::stock::SetStockLevelRequest,
        handlers::stock::StockLevelChangeView,
        handlers::movements::MovementView,
        crate::services::dashboard::DashboardStats,
        crate::services::dashboard::PendingOperation,
    ))
)]
pub struct ApiDoc;

/// Mounts the generated OpenAPI document and Swagger UI.
pub fn swagger_routes() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
