use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::{location, product, transfer, transfer_item, warehouse};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::documents::{
    self, DocumentFilters, DocumentKind, DocumentStatus, ItemInput, TransactionType,
};
use crate::services::receipts::unwrap_txn_err;
use crate::services::{sequences, stock};

#[derive(Debug, Clone)]
pub struct CreateTransferInput {
    pub from_warehouse_id: Uuid,
    pub from_location_id: Uuid,
    pub to_warehouse_id: Uuid,
    pub to_location_id: Uuid,
    pub schedule_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub items: Vec<ItemInput>,
}

#[derive(Debug, Clone)]
pub struct TransferItemDetail {
    pub item: transfer_item::Model,
    pub product_name: String,
    pub sku: String,
}

#[derive(Debug, Clone)]
pub struct TransferDetail {
    pub transfer: transfer::Model,
    pub from_warehouse_name: String,
    pub from_location_name: String,
    pub to_warehouse_name: String,
    pub to_location_name: String,
    pub items: Vec<TransferItemDetail>,
}

/// Service for inter-location stock documents. Validation writes a pair of
/// ledger entries per item: negative at the source, positive at the
/// destination, sharing the transfer's reference.
#[derive(Clone)]
pub struct TransferService {
    db_pool: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl TransferService {
    pub fn new(db_pool: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a transfer in Draft. The reference carries the source
    /// warehouse's code. Availability at the source is pre-checked.
    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        input: CreateTransferInput,
        responsible: Uuid,
    ) -> Result<transfer::Model, ServiceError> {
        documents::validate_items(&input.items)?;
        if input.from_location_id == input.to_location_id {
            return Err(ServiceError::ValidationError(
                "transfer source and destination must differ".to_string(),
            ));
        }

        let db = self.db_pool.clone();
        let created = db
            .transaction::<_, transfer::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let from_wh = warehouse::Entity::find_by_id(input.from_warehouse_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Warehouse {} not found",
                                input.from_warehouse_id
                            ))
                        })?;
                    let to_wh = warehouse::Entity::find_by_id(input.to_warehouse_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Warehouse {} not found",
                                input.to_warehouse_id
                            ))
                        })?;
                    let from_loc = location::Entity::find_by_id(input.from_location_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Location {} not found",
                                input.from_location_id
                            ))
                        })?;
                    let to_loc = location::Entity::find_by_id(input.to_location_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Location {} not found",
                                input.to_location_id
                            ))
                        })?;
                    if from_loc.warehouse_id != from_wh.id {
                        return Err(ServiceError::ValidationError(format!(
                            "Location {} does not belong to warehouse {}",
                            from_loc.id, from_wh.id
                        )));
                    }
                    if to_loc.warehouse_id != to_wh.id {
                        return Err(ServiceError::ValidationError(format!(
                            "Location {} does not belong to warehouse {}",
                            to_loc.id, to_wh.id
                        )));
                    }
                    documents::ensure_products_exist(txn, &input.items).await?;

                    let demand = documents::aggregate_demand(&input.items);
                    documents::check_availability(txn, from_loc.id, &demand).await?;

                    let reference =
                        sequences::next_reference(txn, DocumentKind::Transfer, &from_wh.short_code)
                            .await?;
                    let now = Utc::now();

                    let header = transfer::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        reference: Set(reference),
                        from_warehouse_id: Set(from_wh.id),
                        from_location_id: Set(from_loc.id),
                        to_warehouse_id: Set(to_wh.id),
                        to_location_id: Set(to_loc.id),
                        schedule_date: Set(input.schedule_date),
                        status: Set(DocumentStatus::Draft.to_string()),
                        responsible: Set(responsible),
                        validated_at: Set(None),
                        validated_by: Set(None),
                        notes: Set(input.notes.clone()),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(txn)
                    .await?;

                    for item in &input.items {
                        transfer_item::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            transfer_id: Set(header.id),
                            product_id: Set(item.product_id),
                            quantity: Set(item.quantity),
                            created_at: Set(now),
                        }
                        .insert(txn)
                        .await?;
                    }

                    Ok(header)
                })
            })
            .await
            .map_err(unwrap_txn_err)?;

        info!(reference = %created.reference, "transfer created");
        self.event_sender.emit(Event::DocumentCreated {
            document_id: created.id,
            document_type: DocumentKind::Transfer.as_str().to_string(),
            reference: created.reference.clone(),
        });

        Ok(created)
    }

    /// Explicit forward-only status move (Draft → Ready).
    #[instrument(skip(self))]
    pub async fn set_status(
        &self,
        id: Uuid,
        new_status: DocumentStatus,
    ) -> Result<transfer::Model, ServiceError> {
        let conn = self.db_pool.as_ref();
        let current = transfer::Entity::find_by_id(id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Transfer {} not found", id)))?;
        let status = DocumentStatus::parse(&current.status)?;

        if !status.can_advance_to(new_status, DocumentKind::Transfer) {
            return Err(ServiceError::InvalidStatus(format!(
                "cannot move transfer {} from {} to {}",
                current.reference, status, new_status
            )));
        }

        let result = transfer::Entity::update_many()
            .col_expr(
                transfer::Column::Status,
                Expr::value(new_status.to_string()),
            )
            .col_expr(transfer::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(transfer::Column::Id.eq(id))
            .filter(transfer::Column::Status.eq(status.to_string()))
            .exec(conn)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::Conflict(format!(
                "transfer {} was updated concurrently",
                current.reference
            )));
        }

        self.event_sender.emit(Event::DocumentStatusChanged {
            document_id: id,
            document_type: DocumentKind::Transfer.as_str().to_string(),
            reference: current.reference.clone(),
            old_status: status.to_string(),
            new_status: new_status.to_string(),
        });

        self.fetch(id).await
    }

    /// Validates a transfer: moves it to Done and writes the paired ledger
    /// entries. Unlike receipts and deliveries, any status short of Done is
    /// accepted here; the lifecycle only forbids re-validating a Done
    /// transfer.
    #[instrument(skip(self))]
    pub async fn validate(
        &self,
        id: Uuid,
        validated_by: Uuid,
    ) -> Result<transfer::Model, ServiceError> {
        let db = self.db_pool.clone();
        let (updated, events) = db
            .transaction::<_, (transfer::Model, Vec<Event>), ServiceError>(move |txn| {
                Box::pin(async move {
                    let header = transfer::Entity::find_by_id(id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Transfer {} not found", id))
                        })?;
                    let status = DocumentStatus::parse(&header.status)?;
                    if status == DocumentStatus::Done {
                        return Err(ServiceError::InvalidStatus(format!(
                            "transfer {} is already Done",
                            header.reference
                        )));
                    }

                    let now = Utc::now();
                    let result = transfer::Entity::update_many()
                        .col_expr(
                            transfer::Column::Status,
                            Expr::value(DocumentStatus::Done.to_string()),
                        )
                        .col_expr(transfer::Column::ValidatedAt, Expr::value(now))
                        .col_expr(transfer::Column::ValidatedBy, Expr::value(validated_by))
                        .col_expr(transfer::Column::UpdatedAt, Expr::value(now))
                        .filter(transfer::Column::Id.eq(id))
                        .filter(transfer::Column::Status.eq(status.to_string()))
                        .exec(txn)
                        .await?;
                    if result.rows_affected == 0 {
                        return Err(ServiceError::Conflict(format!(
                            "transfer {} was validated concurrently",
                            header.reference
                        )));
                    }

                    let items = transfer_item::Entity::find()
                        .filter(transfer_item::Column::TransferId.eq(id))
                        .all(txn)
                        .await?;

                    // Both ends of every item participate in the lock set;
                    // canonical ordering keeps concurrent transfers that
                    // cross the same pairs deadlock-free.
                    let mut pairs: Vec<(Uuid, Uuid)> = Vec::with_capacity(items.len() * 2);
                    for item in &items {
                        pairs.push((item.product_id, header.from_location_id));
                        pairs.push((item.product_id, header.to_location_id));
                    }
                    for (product_id, location_id) in stock::canonical_lock_order(&pairs) {
                        stock::lock_pair(txn, product_id, location_id).await?;
                    }

                    let item_inputs: Vec<ItemInput> = items
                        .iter()
                        .map(|i| ItemInput {
                            product_id: i.product_id,
                            quantity: i.quantity,
                            unit_cost: None,
                        })
                        .collect();
                    let demand = documents::aggregate_demand(&item_inputs);
                    documents::check_availability(txn, header.from_location_id, &demand).await?;

                    let mut events = Vec::with_capacity(items.len() * 2 + 1);
                    for item in &items {
                        stock::record_movement(
                            txn,
                            stock::NewMovement {
                                product_id: item.product_id,
                                warehouse_id: header.from_warehouse_id,
                                location_id: header.from_location_id,
                                quantity: -item.quantity,
                                transaction_type: TransactionType::Transfer,
                                reference: header.reference.clone(),
                            },
                        )
                        .await?;
                        stock::record_movement(
                            txn,
                            stock::NewMovement {
                                product_id: item.product_id,
                                warehouse_id: header.to_warehouse_id,
                                location_id: header.to_location_id,
                                quantity: item.quantity,
                                transaction_type: TransactionType::Transfer,
                                reference: header.reference.clone(),
                            },
                        )
                        .await?;

                        let source_on_hand =
                            stock::on_hand(txn, item.product_id, header.from_location_id).await?;
                        let dest_on_hand =
                            stock::on_hand(txn, item.product_id, header.to_location_id).await?;
                        events.push(Event::StockChanged {
                            product_id: item.product_id,
                            warehouse_id: header.from_warehouse_id,
                            location_id: header.from_location_id,
                            quantity_delta: -item.quantity,
                            on_hand: source_on_hand,
                            reference: header.reference.clone(),
                        });
                        events.push(Event::StockChanged {
                            product_id: item.product_id,
                            warehouse_id: header.to_warehouse_id,
                            location_id: header.to_location_id,
                            quantity_delta: item.quantity,
                            on_hand: dest_on_hand,
                            reference: header.reference.clone(),
                        });
                    }
                    events.push(Event::DocumentValidated {
                        document_id: header.id,
                        document_type: DocumentKind::Transfer.as_str().to_string(),
                        reference: header.reference.clone(),
                        validated_by,
                        validated_at: now,
                    });

                    let updated = transfer::Entity::find_by_id(id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Transfer {} not found", id))
                        })?;
                    Ok((updated, events))
                })
            })
            .await
            .map_err(unwrap_txn_err)?;

        info!(reference = %updated.reference, "transfer validated");
        for event in events {
            self.event_sender.emit(event);
        }

        Ok(updated)
    }

    pub async fn list(
        &self,
        filters: DocumentFilters,
    ) -> Result<(Vec<transfer::Model>, u64), ServiceError> {
        let per_page = filters.per_page.clamp(1, 200);
        let page = filters.page.max(1);

        let mut query = transfer::Entity::find().order_by_desc(transfer::Column::CreatedAt);
        if let Some(status) = filters.status {
            query = query.filter(transfer::Column::Status.eq(status.to_string()));
        }
        if let Some(warehouse_id) = filters.warehouse_id {
            query = query.filter(
                Condition::any()
                    .add(transfer::Column::FromWarehouseId.eq(warehouse_id))
                    .add(transfer::Column::ToWarehouseId.eq(warehouse_id)),
            );
        }
        if let Some(search) = &filters.search {
            query = query.filter(
                Condition::any()
                    .add(transfer::Column::Reference.contains(search))
                    .add(transfer::Column::Notes.contains(search)),
            );
        }

        let paginator = query.paginate(self.db_pool.as_ref(), per_page);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page - 1).await?;
        Ok((rows, total))
    }

    pub async fn get(&self, id: Uuid) -> Result<TransferDetail, ServiceError> {
        let conn = self.db_pool.as_ref();
        let header = self.fetch(id).await?;

        let items = transfer_item::Entity::find()
            .filter(transfer_item::Column::TransferId.eq(id))
            .all(conn)
            .await?;
        let product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        let products: BTreeMap<Uuid, product::Model> = product::Entity::find()
            .filter(product::Column::Id.is_in(product_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let warehouses: BTreeMap<Uuid, String> = warehouse::Entity::find()
            .filter(
                warehouse::Column::Id
                    .is_in([header.from_warehouse_id, header.to_warehouse_id]),
            )
            .all(conn)
            .await?
            .into_iter()
            .map(|w| (w.id, w.name))
            .collect();
        let locations: BTreeMap<Uuid, String> = location::Entity::find()
            .filter(
                location::Column::Id.is_in([header.from_location_id, header.to_location_id]),
            )
            .all(conn)
            .await?
            .into_iter()
            .map(|l| (l.id, l.name))
            .collect();

        let from_warehouse_name = warehouses
            .get(&header.from_warehouse_id)
            .cloned()
            .unwrap_or_default();
        let to_warehouse_name = warehouses
            .get(&header.to_warehouse_id)
            .cloned()
            .unwrap_or_default();
        let from_location_name = locations
            .get(&header.from_location_id)
            .cloned()
            .unwrap_or_default();
        let to_location_name = locations
            .get(&header.to_location_id)
            .cloned()
            .unwrap_or_default();

        let items = items
            .into_iter()
            .map(|item| {
                let product = products.get(&item.product_id);
                TransferItemDetail {
                    product_name: product.map(|p| p.name.clone()).unwrap_or_default(),
                    sku: product.map(|p| p.sku.clone()).unwrap_or_default(),
                    item,
                }
            })
            .collect();

        Ok(TransferDetail {
            transfer: header,
            from_warehouse_name,
            from_location_name,
            to_warehouse_name,
            to_location_name,
            items,
        })
    }

    async fn fetch(&self, id: Uuid) -> Result<transfer::Model, ServiceError> {
        transfer::Entity::find_by_id(id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Transfer {} not found", id)))
    }
}
