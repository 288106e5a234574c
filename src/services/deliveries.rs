use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::{delivery, delivery_item, location, product, warehouse};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::documents::{
    self, DocumentFilters, DocumentKind, DocumentStatus, ItemInput, TransactionType,
};
use crate::services::receipts::unwrap_txn_err;
use crate::services::{sequences, stock};

#[derive(Debug, Clone)]
pub struct CreateDeliveryInput {
    pub delivery_address: String,
    pub warehouse_id: Uuid,
    pub location_id: Uuid,
    pub schedule_date: DateTime<Utc>,
    pub operation_type: Option<String>,
    pub items: Vec<ItemInput>,
}

#[derive(Debug, Clone)]
pub struct DeliveryItemDetail {
    pub item: delivery_item::Model,
    pub product_name: String,
    pub sku: String,
}

#[derive(Debug, Clone)]
pub struct DeliveryDetail {
    pub delivery: delivery::Model,
    pub warehouse_name: String,
    pub location_name: String,
    pub items: Vec<DeliveryItemDetail>,
}

/// Service for outbound stock documents. Availability is checked twice:
/// once at creation as an early signal, and again under locks at
/// validation, which is the check that actually guarantees no oversell.
#[derive(Clone)]
pub struct DeliveryService {
    db_pool: Arc<DatabaseConnection>,
    event_sender: EventSender,
    low_stock_threshold: Decimal,
}

impl DeliveryService {
    pub fn new(
        db_pool: Arc<DatabaseConnection>,
        event_sender: EventSender,
        low_stock_threshold: Decimal,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            low_stock_threshold,
        }
    }

    /// Creates a delivery in Draft. Fails with an itemized shortage report
    /// when any product lacks stock at the source location; the whole
    /// creation is rejected, no partial documents.
    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        input: CreateDeliveryInput,
        responsible: Uuid,
    ) -> Result<delivery::Model, ServiceError> {
        documents::validate_items(&input.items)?;

        let db = self.db_pool.clone();
        let created = db
            .transaction::<_, delivery::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let wh = warehouse::Entity::find_by_id(input.warehouse_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Warehouse {} not found",
                                input.warehouse_id
                            ))
                        })?;
                    let loc = location::Entity::find_by_id(input.location_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Location {} not found",
                                input.location_id
                            ))
                        })?;
                    if loc.warehouse_id != wh.id {
                        return Err(ServiceError::ValidationError(format!(
                            "Location {} does not belong to warehouse {}",
                            loc.id, wh.id
                        )));
                    }
                    documents::ensure_products_exist(txn, &input.items).await?;

                    let demand = documents::aggregate_demand(&input.items);
                    documents::check_availability(txn, loc.id, &demand).await?;

                    let reference =
                        sequences::next_reference(txn, DocumentKind::Delivery, &wh.short_code)
                            .await?;
                    let now = Utc::now();

                    let header = delivery::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        reference: Set(reference),
                        delivery_address: Set(input.delivery_address.clone()),
                        warehouse_id: Set(wh.id),
                        location_id: Set(loc.id),
                        schedule_date: Set(input.schedule_date),
                        operation_type: Set(input.operation_type.clone()),
                        status: Set(DocumentStatus::Draft.to_string()),
                        responsible: Set(responsible),
                        validated_at: Set(None),
                        validated_by: Set(None),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(txn)
                    .await?;

                    for item in &input.items {
                        delivery_item::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            delivery_id: Set(header.id),
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

        info!(reference = %created.reference, "delivery created");
        self.event_sender.emit(Event::DocumentCreated {
            document_id: created.id,
            document_type: DocumentKind::Delivery.as_str().to_string(),
            reference: created.reference.clone(),
        });

        Ok(created)
    }

    /// Explicit forward-only status move (Draft → Waiting → Ready).
    #[instrument(skip(self))]
    pub async fn set_status(
        &self,
        id: Uuid,
        new_status: DocumentStatus,
    ) -> Result<delivery::Model, ServiceError> {
        let conn = self.db_pool.as_ref();
        let current = delivery::Entity::find_by_id(id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Delivery {} not found", id)))?;
        let status = DocumentStatus::parse(&current.status)?;

        if !status.can_advance_to(new_status, DocumentKind::Delivery) {
            return Err(ServiceError::InvalidStatus(format!(
                "cannot move delivery {} from {} to {}",
                current.reference, status, new_status
            )));
        }

        let result = delivery::Entity::update_many()
            .col_expr(
                delivery::Column::Status,
                Expr::value(new_status.to_string()),
            )
            .col_expr(delivery::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(delivery::Column::Id.eq(id))
            .filter(delivery::Column::Status.eq(status.to_string()))
            .exec(conn)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::Conflict(format!(
                "delivery {} was updated concurrently",
                current.reference
            )));
        }

        self.event_sender.emit(Event::DocumentStatusChanged {
            document_id: id,
            document_type: DocumentKind::Delivery.as_str().to_string(),
            reference: current.reference.clone(),
            old_status: status.to_string(),
            new_status: new_status.to_string(),
        });

        self.fetch(id).await
    }

    /// Validates a Ready delivery: re-checks availability under the pair
    /// locks, flips to Done and appends one negative ledger entry per item.
    /// Any shortage rolls the whole validation back.
    #[instrument(skip(self))]
    pub async fn validate(
        &self,
        id: Uuid,
        validated_by: Uuid,
    ) -> Result<delivery::Model, ServiceError> {
        let threshold = self.low_stock_threshold;
        let db = self.db_pool.clone();
        let (updated, events) = db
            .transaction::<_, (delivery::Model, Vec<Event>), ServiceError>(move |txn| {
                Box::pin(async move {
                    let header = delivery::Entity::find_by_id(id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Delivery {} not found", id))
                        })?;
                    let status = DocumentStatus::parse(&header.status)?;
                    if status != DocumentStatus::Ready {
                        return Err(ServiceError::InvalidStatus(format!(
                            "delivery {} is {}, only Ready deliveries can be validated",
                            header.reference, status
                        )));
                    }

                    let now = Utc::now();
                    let result = delivery::Entity::update_many()
                        .col_expr(
                            delivery::Column::Status,
                            Expr::value(DocumentStatus::Done.to_string()),
                        )
                        .col_expr(delivery::Column::ValidatedAt, Expr::value(now))
                        .col_expr(delivery::Column::ValidatedBy, Expr::value(validated_by))
                        .col_expr(delivery::Column::UpdatedAt, Expr::value(now))
                        .filter(delivery::Column::Id.eq(id))
                        .filter(delivery::Column::Status.eq(status.to_string()))
                        .exec(txn)
                        .await?;
                    if result.rows_affected == 0 {
                        return Err(ServiceError::Conflict(format!(
                            "delivery {} was validated concurrently",
                            header.reference
                        )));
                    }

                    let items = delivery_item::Entity::find()
                        .filter(delivery_item::Column::DeliveryId.eq(id))
                        .all(txn)
                        .await?;

                    // Every touched pair must be locked before the
                    // availability re-check.
                    let pairs: Vec<(Uuid, Uuid)> = items
                        .iter()
                        .map(|i| (i.product_id, header.location_id))
                        .collect();
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
                    documents::check_availability(txn, header.location_id, &demand).await?;

                    let mut events = Vec::with_capacity(items.len() + 1);
                    for item in &items {
                        stock::record_movement(
                            txn,
                            stock::NewMovement {
                                product_id: item.product_id,
                                warehouse_id: header.warehouse_id,
                                location_id: header.location_id,
                                quantity: -item.quantity,
                                transaction_type: TransactionType::Delivery,
                                reference: header.reference.clone(),
                            },
                        )
                        .await?;
                        let on_hand =
                            stock::on_hand(txn, item.product_id, header.location_id).await?;
                        events.push(Event::StockChanged {
                            product_id: item.product_id,
                            warehouse_id: header.warehouse_id,
                            location_id: header.location_id,
                            quantity_delta: -item.quantity,
                            on_hand,
                            reference: header.reference.clone(),
                        });
                        if on_hand < threshold {
                            events.push(Event::LowStock {
                                product_id: item.product_id,
                                warehouse_id: header.warehouse_id,
                                location_id: header.location_id,
                                on_hand,
                                threshold,
                            });
                        }
                    }
                    events.push(Event::DocumentValidated {
                        document_id: header.id,
                        document_type: DocumentKind::Delivery.as_str().to_string(),
                        reference: header.reference.clone(),
                        validated_by,
                        validated_at: now,
                    });

                    let updated = delivery::Entity::find_by_id(id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Delivery {} not found", id))
                        })?;
                    Ok((updated, events))
                })
            })
            .await
            .map_err(unwrap_txn_err)?;

        info!(reference = %updated.reference, "delivery validated");
        for event in events {
            self.event_sender.emit(event);
        }

        Ok(updated)
    }

    pub async fn list(
        &self,
        filters: DocumentFilters,
    ) -> Result<(Vec<delivery::Model>, u64), ServiceError> {
        let per_page = filters.per_page.clamp(1, 200);
        let page = filters.page.max(1);

        let mut query = delivery::Entity::find().order_by_desc(delivery::Column::CreatedAt);
        if let Some(status) = filters.status {
            query = query.filter(delivery::Column::Status.eq(status.to_string()));
        }
        if let Some(warehouse_id) = filters.warehouse_id {
            query = query.filter(delivery::Column::WarehouseId.eq(warehouse_id));
        }
        if let Some(search) = &filters.search {
            query = query.filter(
                Condition::any()
                    .add(delivery::Column::Reference.contains(search))
                    .add(delivery::Column::DeliveryAddress.contains(search)),
            );
        }

        let paginator = query.paginate(self.db_pool.as_ref(), per_page);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page - 1).await?;
        Ok((rows, total))
    }

    pub async fn get(&self, id: Uuid) -> Result<DeliveryDetail, ServiceError> {
        let conn = self.db_pool.as_ref();
        let header = self.fetch(id).await?;

        let items = delivery_item::Entity::find()
            .filter(delivery_item::Column::DeliveryId.eq(id))
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

        let warehouse_name = warehouse::Entity::find_by_id(header.warehouse_id)
            .one(conn)
            .await?
            .map(|w| w.name)
            .unwrap_or_default();
        let location_name = location::Entity::find_by_id(header.location_id)
            .one(conn)
            .await?
            .map(|l| l.name)
            .unwrap_or_default();

        let items = items
            .into_iter()
            .map(|item| {
                let product = products.get(&item.product_id);
                DeliveryItemDetail {
                    product_name: product.map(|p| p.name.clone()).unwrap_or_default(),
                    sku: product.map(|p| p.sku.clone()).unwrap_or_default(),
                    item,
                }
            })
            .collect();

        Ok(DeliveryDetail {
            delivery: header,
            warehouse_name,
            location_name,
            items,
        })
    }

    async fn fetch(&self, id: Uuid) -> Result<delivery::Model, ServiceError> {
        delivery::Entity::find_by_id(id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Delivery {} not found", id)))
    }
}
