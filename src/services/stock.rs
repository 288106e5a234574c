use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbBackend, DbErr, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionError, TransactionTrait,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::{delivery, location, product, receipt, stock_ledger, stock_lock, warehouse};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::documents::TransactionType;

/// A ledger entry about to be appended. Quantity carries the sign:
/// positive into the location, negative out of it.
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub location_id: Uuid,
    pub quantity: Decimal,
    pub transaction_type: TransactionType,
    pub reference: String,
}

#[derive(FromQueryResult)]
struct QtySum {
    total: Option<Decimal>,
}

/// On-hand quantity for one (product, location) pair: SUM over the ledger,
/// zero when no entries exist. The single source of truth; there is no
/// materialized balance anywhere.
pub async fn on_hand<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    location_id: Uuid,
) -> Result<Decimal, ServiceError> {
    let row = stock_ledger::Entity::find()
        .select_only()
        .column_as(stock_ledger::Column::Quantity.sum(), "total")
        .filter(stock_ledger::Column::ProductId.eq(product_id))
        .filter(stock_ledger::Column::LocationId.eq(location_id))
        .into_model::<QtySum>()
        .one(conn)
        .await?;

    Ok(row.and_then(|r| r.total).unwrap_or(Decimal::ZERO))
}

/// Appends one immutable ledger entry inside the caller's transaction and
/// returns its id. Entries are never updated or deleted afterwards.
pub async fn record_movement<C: ConnectionTrait>(
    conn: &C,
    movement: NewMovement,
) -> Result<Uuid, ServiceError> {
    let id = Uuid::new_v4();
    let entry = stock_ledger::ActiveModel {
        id: Set(id),
        product_id: Set(movement.product_id),
        warehouse_id: Set(movement.warehouse_id),
        location_id: Set(movement.location_id),
        quantity: Set(movement.quantity),
        transaction_type: Set(movement.transaction_type.to_string()),
        reference: Set(movement.reference),
        created_at: Set(Utc::now()),
    };
    entry.insert(conn).await?;
    Ok(id)
}

/// Serializes check-then-write sequences on one (product, location) pair.
///
/// Upserts the anchor row, then takes it FOR UPDATE on Postgres so a
/// concurrent validation of the same pair blocks until this transaction
/// commits. SQLite allows a single writer at a time, so the lock step is
/// skipped there. Callers locking several pairs must do so in canonical
/// (sorted) order to avoid deadlock.
pub async fn lock_pair(
    txn: &DatabaseTransaction,
    product_id: Uuid,
    location_id: Uuid,
) -> Result<(), ServiceError> {
    let anchor = stock_lock::ActiveModel {
        product_id: Set(product_id),
        location_id: Set(location_id),
    };
    let insert = stock_lock::Entity::insert(anchor)
        .on_conflict(
            OnConflict::columns([stock_lock::Column::ProductId, stock_lock::Column::LocationId])
                .do_nothing()
                .to_owned(),
        )
        .exec(txn)
        .await;
    match insert {
        Ok(_) | Err(DbErr::RecordNotInserted) => {}
        Err(e) => return Err(e.into()),
    }

    if txn.get_database_backend() == DbBackend::Postgres {
        stock_lock::Entity::find_by_id((product_id, location_id))
            .lock_exclusive()
            .one(txn)
            .await?;
    }

    Ok(())
}

/// Sorts (product, location) pairs into the canonical locking order and
/// drops duplicates.
pub fn canonical_lock_order(pairs: &[(Uuid, Uuid)]) -> Vec<(Uuid, Uuid)> {
    let set: BTreeSet<(Uuid, Uuid)> = pairs.iter().copied().collect();
    set.into_iter().collect()
}

/// One row of the aggregated `/stock` listing.
#[derive(Debug, Clone)]
pub struct StockRow {
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

#[derive(Debug, Clone, Default)]
pub struct StockFilters {
    pub search: Option<String>,
    pub warehouse_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
}

/// One row of the `/movements` history listing.
#[derive(Debug, Clone)]
pub struct MovementRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: String,
    pub warehouse_id: Uuid,
    pub warehouse_name: String,
    pub location_id: Uuid,
    pub location_name: String,
    pub quantity: Decimal,
    pub transaction_type: String,
    pub reference: String,
    pub counterparty: Option<String>,
    pub created_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct MovementFilters {
    pub product_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub transaction_type: Option<TransactionType>,
    pub reference: Option<String>,
    pub page: u64,
    pub per_page: u64,
}

/// Result of a manual stock level set.
#[derive(Debug, Clone)]
pub struct StockLevelChange {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub location_id: Uuid,
    pub previous_quantity: Decimal,
    pub new_quantity: Decimal,
    pub delta: Decimal,
    pub reference: Option<String>,
}

#[derive(FromQueryResult)]
struct StockAggRow {
    product_id: Uuid,
    warehouse_id: Uuid,
    location_id: Uuid,
    total: Option<Decimal>,
}

/// Read-side queries and manual adjustments over the stock ledger.
#[derive(Clone)]
pub struct StockService {
    db_pool: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl StockService {
    pub fn new(db_pool: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Sets the absolute on-hand level of one (product, location) pair by
    /// appending a single Adjustment entry for the difference. Bypasses the
    /// document lifecycle; meant for manual corrections and stocktakes.
    #[instrument(skip(self))]
    pub async fn set_level(
        &self,
        product_id: Uuid,
        location_id: Uuid,
        quantity: Decimal,
        responsible: Uuid,
    ) -> Result<StockLevelChange, ServiceError> {
        if quantity < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "stock level must not be negative".to_string(),
            ));
        }

        let db = self.db_pool.clone();
        let change = db
            .transaction::<_, StockLevelChange, ServiceError>(move |txn| {
                Box::pin(async move {
                    let loc = location::Entity::find_by_id(location_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Location {} not found", location_id))
                        })?;
                    product::Entity::find_by_id(product_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Product {} not found", product_id))
                        })?;

                    lock_pair(txn, product_id, location_id).await?;
                    let current = on_hand(txn, product_id, location_id).await?;
                    let delta = quantity - current;

                    if delta.is_zero() {
                        return Ok(StockLevelChange {
                            product_id,
                            warehouse_id: loc.warehouse_id,
                            location_id,
                            previous_quantity: current,
                            new_quantity: current,
                            delta,
                            reference: None,
                        });
                    }

                    let suffix = Uuid::new_v4().simple().to_string();
                    let reference = format!("ADJ/{}", &suffix[..8]);
                    record_movement(
                        txn,
                        NewMovement {
                            product_id,
                            warehouse_id: loc.warehouse_id,
                            location_id,
                            quantity: delta,
                            transaction_type: TransactionType::Adjustment,
                            reference: reference.clone(),
                        },
                    )
                    .await?;

                    Ok(StockLevelChange {
                        product_id,
                        warehouse_id: loc.warehouse_id,
                        location_id,
                        previous_quantity: current,
                        new_quantity: quantity,
                        delta,
                        reference: Some(reference),
                    })
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        if let Some(reference) = &change.reference {
            info!(
                %product_id,
                %location_id,
                %responsible,
                reference,
                previous = %change.previous_quantity,
                new = %change.new_quantity,
                "stock level set manually"
            );
            self.event_sender.emit(Event::StockChanged {
                product_id,
                warehouse_id: change.warehouse_id,
                location_id,
                quantity_delta: change.delta,
                on_hand: change.new_quantity,
                reference: reference.clone(),
            });
        }

        Ok(change)
    }

    /// Aggregated on-hand per (product, location), with denormalized names
    /// for the listing. Pairs whose entries sum to zero are still listed.
    pub async fn stock_overview(&self, filters: StockFilters) -> Result<Vec<StockRow>, ServiceError> {
        let mut query = stock_ledger::Entity::find()
            .select_only()
            .column(stock_ledger::Column::ProductId)
            .column(stock_ledger::Column::WarehouseId)
            .column(stock_ledger::Column::LocationId)
            .column_as(stock_ledger::Column::Quantity.sum(), "total")
            .group_by(stock_ledger::Column::ProductId)
            .group_by(stock_ledger::Column::WarehouseId)
            .group_by(stock_ledger::Column::LocationId);

        if let Some(warehouse_id) = filters.warehouse_id {
            query = query.filter(stock_ledger::Column::WarehouseId.eq(warehouse_id));
        }
        if let Some(location_id) = filters.location_id {
            query = query.filter(stock_ledger::Column::LocationId.eq(location_id));
        }

        let rows = query
            .into_model::<StockAggRow>()
            .all(self.db_pool.as_ref())
            .await?;

        let (products, warehouses, locations) = self
            .load_names(
                rows.iter().map(|r| r.product_id).collect(),
                rows.iter().map(|r| r.warehouse_id).collect(),
                rows.iter().map(|r| r.location_id).collect(),
            )
            .await?;

        let needle = filters.search.as_deref().map(str::to_lowercase);

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(product) = products.get(&row.product_id) else {
                continue;
            };
            if let Some(needle) = &needle {
                let matches = product.name.to_lowercase().contains(needle)
                    || product.sku.to_lowercase().contains(needle);
                if !matches {
                    continue;
                }
            }
            out.push(StockRow {
                product_id: row.product_id,
                product_name: product.name.clone(),
                sku: product.sku.clone(),
                unit_cost: product.unit_cost,
                warehouse_id: row.warehouse_id,
                warehouse_name: warehouses
                    .get(&row.warehouse_id)
                    .cloned()
                    .unwrap_or_default(),
                location_id: row.location_id,
                location_name: locations.get(&row.location_id).cloned().unwrap_or_default(),
                on_hand: row.total.unwrap_or(Decimal::ZERO),
            });
        }

        out.sort_by(|a, b| {
            a.product_name
                .cmp(&b.product_name)
                .then_with(|| a.location_name.cmp(&b.location_name))
        });
        Ok(out)
    }

    /// Paginated ledger history with denormalized names and the
    /// counterparty pulled from the owning document.
    pub async fn movements(
        &self,
        filters: MovementFilters,
    ) -> Result<(Vec<MovementRow>, u64), ServiceError> {
        let per_page = filters.per_page.clamp(1, 200);
        let page = filters.page.max(1);

        let mut query = stock_ledger::Entity::find()
            .order_by_desc(stock_ledger::Column::CreatedAt);

        if let Some(product_id) = filters.product_id {
            query = query.filter(stock_ledger::Column::ProductId.eq(product_id));
        }
        if let Some(location_id) = filters.location_id {
            query = query.filter(stock_ledger::Column::LocationId.eq(location_id));
        }
        if let Some(warehouse_id) = filters.warehouse_id {
            query = query.filter(stock_ledger::Column::WarehouseId.eq(warehouse_id));
        }
        if let Some(transaction_type) = filters.transaction_type {
            query = query
                .filter(stock_ledger::Column::TransactionType.eq(transaction_type.to_string()));
        }
        if let Some(reference) = &filters.reference {
            query = query.filter(stock_ledger::Column::Reference.contains(reference));
        }

        let paginator = query.paginate(self.db_pool.as_ref(), per_page);
        let total = paginator.num_items().await?;
        let entries = paginator.fetch_page(page - 1).await?;

        let (products, warehouses, locations) = self
            .load_names(
                entries.iter().map(|e| e.product_id).collect(),
                entries.iter().map(|e| e.warehouse_id).collect(),
                entries.iter().map(|e| e.location_id).collect(),
            )
            .await?;
        let counterparties = self
            .load_counterparties(entries.iter().map(|e| e.reference.clone()).collect())
            .await?;

        let rows = entries
            .into_iter()
            .map(|entry| {
                let product = products.get(&entry.product_id);
                MovementRow {
                    id: entry.id,
                    product_id: entry.product_id,
                    product_name: product.map(|p| p.name.clone()).unwrap_or_default(),
                    sku: product.map(|p| p.sku.clone()).unwrap_or_default(),
                    warehouse_id: entry.warehouse_id,
                    warehouse_name: warehouses
                        .get(&entry.warehouse_id)
                        .cloned()
                        .unwrap_or_default(),
                    location_id: entry.location_id,
                    location_name: locations
                        .get(&entry.location_id)
                        .cloned()
                        .unwrap_or_default(),
                    quantity: entry.quantity,
                    transaction_type: entry.transaction_type,
                    counterparty: counterparties.get(&entry.reference).cloned(),
                    reference: entry.reference,
                    created_at: entry.created_at,
                }
            })
            .collect();

        Ok((rows, total))
    }

    async fn load_names(
        &self,
        product_ids: Vec<Uuid>,
        warehouse_ids: Vec<Uuid>,
        location_ids: Vec<Uuid>,
    ) -> Result<
        (
            BTreeMap<Uuid, product::Model>,
            BTreeMap<Uuid, String>,
            BTreeMap<Uuid, String>,
        ),
        ServiceError,
    > {
        let conn = self.db_pool.as_ref();

        let products = product::Entity::find()
            .filter(product::Column::Id.is_in(dedup(product_ids)))
            .all(conn)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let warehouses = warehouse::Entity::find()
            .filter(warehouse::Column::Id.is_in(dedup(warehouse_ids)))
            .all(conn)
            .await?
            .into_iter()
            .map(|w| (w.id, w.name))
            .collect();
        let locations = location::Entity::find()
            .filter(location::Column::Id.is_in(dedup(location_ids)))
            .all(conn)
            .await?
            .into_iter()
            .map(|l| (l.id, l.name))
            .collect();

        Ok((products, warehouses, locations))
    }

    /// Resolves the counterparty shown on movement rows: the supplier of
    /// the owning receipt or the destination address of the owning
    /// delivery. Transfers and adjustments have none.
    async fn load_counterparties(
        &self,
        references: Vec<String>,
    ) -> Result<BTreeMap<String, String>, ServiceError> {
        let refs = dedup(references);
        if refs.is_empty() {
            return Ok(BTreeMap::new());
        }
        let conn = self.db_pool.as_ref();
        let mut out = BTreeMap::new();

        for r in receipt::Entity::find()
            .filter(receipt::Column::Reference.is_in(refs.clone()))
            .all(conn)
            .await?
        {
            out.insert(r.reference, r.receive_from);
        }
        for d in delivery::Entity::find()
            .filter(delivery::Column::Reference.is_in(refs))
            .all(conn)
            .await?
        {
            out.insert(d.reference, d.delivery_address);
        }

        Ok(out)
    }
}

fn dedup<T: Ord>(items: Vec<T>) -> Vec<T> {
    let set: BTreeSet<T> = items.into_iter().collect();
    set.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_order_is_sorted_and_deduplicated() {
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        let l1 = Uuid::from_u128(10);
        let l2 = Uuid::from_u128(20);

        let ordered = canonical_lock_order(&[(b, l2), (a, l1), (b, l2), (a, l2)]);
        assert_eq!(ordered, vec![(a, l1), (a, l2), (b, l2)]);
    }

    #[test]
    fn dedup_preserves_distinct_values() {
        assert_eq!(dedup(vec![3, 1, 2, 1, 3]), vec![1, 2, 3]);
    }
}
