use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{delivery, location, product, receipt, stock_ledger, transfer, warehouse};
use crate::errors::ServiceError;
use crate::services::documents::DocumentStatus;
use crate::services::stock::{StockFilters, StockRow, StockService};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardStats {
    pub products: u64,
    pub warehouses: u64,
    pub locations: u64,
    pub pending_receipts: u64,
    pub pending_deliveries: u64,
    pub pending_transfers: u64,
    pub movements_last_24h: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PendingOperation {
    pub document_id: Uuid,
    pub document_type: String,
    pub reference: String,
    pub status: String,
    pub schedule_date: DateTime<Utc>,
}

/// Aggregated read models backing the dashboard endpoints.
#[derive(Clone)]
pub struct DashboardService {
    db_pool: Arc<DatabaseConnection>,
    stock: StockService,
    low_stock_threshold: Decimal,
}

impl DashboardService {
    pub fn new(
        db_pool: Arc<DatabaseConnection>,
        stock: StockService,
        low_stock_threshold: Decimal,
    ) -> Self {
        Self {
            db_pool,
            stock,
            low_stock_threshold,
        }
    }

    pub async fn stats(&self) -> Result<DashboardStats, ServiceError> {
        let conn = self.db_pool.as_ref();
        let done = DocumentStatus::Done.to_string();
        let since = Utc::now() - Duration::hours(24);

        let products = product::Entity::find().count(conn).await?;
        let warehouses = warehouse::Entity::find().count(conn).await?;
        let locations = location::Entity::find().count(conn).await?;
        let pending_receipts = receipt::Entity::find()
            .filter(receipt::Column::Status.ne(done.clone()))
            .count(conn)
            .await?;
        let pending_deliveries = delivery::Entity::find()
            .filter(delivery::Column::Status.ne(done.clone()))
            .count(conn)
            .await?;
        let pending_transfers = transfer::Entity::find()
            .filter(transfer::Column::Status.ne(done))
            .count(conn)
            .await?;
        let movements_last_24h = stock_ledger::Entity::find()
            .filter(stock_ledger::Column::CreatedAt.gte(since))
            .count(conn)
            .await?;

        Ok(DashboardStats {
            products,
            warehouses,
            locations,
            pending_receipts,
            pending_deliveries,
            pending_transfers,
            movements_last_24h,
        })
    }

    /// All documents not yet Done, merged across the three kinds and
    /// ordered by schedule date, earliest first.
    pub async fn pending_operations(
        &self,
        limit: usize,
    ) -> Result<Vec<PendingOperation>, ServiceError> {
        let conn = self.db_pool.as_ref();
        let done = DocumentStatus::Done.to_string();
        let mut out = Vec::new();

        for r in receipt::Entity::find()
            .filter(receipt::Column::Status.ne(done.clone()))
            .all(conn)
            .await?
        {
            out.push(PendingOperation {
                document_id: r.id,
                document_type: "receipt".to_string(),
                reference: r.reference,
                status: r.status,
                schedule_date: r.schedule_date,
            });
        }
        for d in delivery::Entity::find()
            .filter(delivery::Column::Status.ne(done.clone()))
            .all(conn)
            .await?
        {
            out.push(PendingOperation {
                document_id: d.id,
                document_type: "delivery".to_string(),
                reference: d.reference,
                status: d.status,
                schedule_date: d.schedule_date,
            });
        }
        for t in transfer::Entity::find()
            .filter(transfer::Column::Status.ne(done))
            .all(conn)
            .await?
        {
            out.push(PendingOperation {
                document_id: t.id,
                document_type: "transfer".to_string(),
                reference: t.reference,
                status: t.status,
                schedule_date: t.schedule_date,
            });
        }

        out.sort_by_key(|op| op.schedule_date);
        out.truncate(limit);
        Ok(out)
    }

    /// Stock rows below the configured threshold.
    pub async fn low_stock(&self) -> Result<Vec<StockRow>, ServiceError> {
        let rows = self.stock.stock_overview(StockFilters::default()).await?;
        Ok(rows
            .into_iter()
            .filter(|row| row.on_hand < self.low_stock_threshold)
            .collect())
    }
}
