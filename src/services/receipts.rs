use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionError, TransactionTrait,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::{location, product, receipt, receipt_item, warehouse};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::documents::{
    self, DocumentFilters, DocumentKind, DocumentStatus, ItemInput,
};
use crate::services::{sequences, stock};

#[derive(Debug, Clone)]
pub struct CreateReceiptInput {
    pub receive_from: String,
    pub warehouse_id: Uuid,
    pub location_id: Uuid,
    pub schedule_date: DateTime<Utc>,
    pub items: Vec<ItemInput>,
}

#[derive(Debug, Clone)]
pub struct ReceiptItemDetail {
    pub item: receipt_item::Model,
    pub product_name: String,
    pub sku: String,
}

#[derive(Debug, Clone)]
pub struct ReceiptDetail {
    pub receipt: receipt::Model,
    pub warehouse_name: String,
    pub location_name: String,
    pub items: Vec<ReceiptItemDetail>,
}

/// Service for inbound stock documents.
#[derive(Clone)]
pub struct ReceiptService {
    db_pool: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl ReceiptService {
    pub fn new(db_pool: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a receipt in Draft with a freshly allocated reference.
    /// Receipts add stock, so no availability check applies here.
    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        input: CreateReceiptInput,
        responsible: Uuid,
    ) -> Result<receipt::Model, ServiceError> {
        documents::validate_items(&input.items)?;

        let db = self.db_pool.clone();
        let created = db
            .transaction::<_, receipt::Model, ServiceError>(move |txn| {
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

                    let reference =
                        sequences::next_reference(txn, DocumentKind::Receipt, &wh.short_code)
                            .await?;
                    let now = Utc::now();

                    let header = receipt::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        reference: Set(reference),
                        receive_from: Set(input.receive_from.clone()),
                        warehouse_id: Set(wh.id),
                        location_id: Set(loc.id),
                        schedule_date: Set(input.schedule_date),
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
                        receipt_item::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            receipt_id: Set(header.id),
                            product_id: Set(item.product_id),
                            quantity: Set(item.quantity),
                            unit_cost: Set(item.unit_cost),
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

        info!(reference = %created.reference, "receipt created");
        self.event_sender.emit(Event::DocumentCreated {
            document_id: created.id,
            document_type: DocumentKind::Receipt.as_str().to_string(),
            reference: created.reference.clone(),
        });

        Ok(created)
    }

    /// Explicit forward-only status move (Draft → Ready). Done is reserved
    /// for `validate`.
    #[instrument(skip(self))]
    pub async fn set_status(
        &self,
        id: Uuid,
        new_status: DocumentStatus,
    ) -> Result<receipt::Model, ServiceError> {
        let conn = self.db_pool.as_ref();
        let current = receipt::Entity::find_by_id(id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Receipt {} not found", id)))?;
        let status = DocumentStatus::parse(&current.status)?;

        if !status.can_advance_to(new_status, DocumentKind::Receipt) {
            return Err(ServiceError::InvalidStatus(format!(
                "cannot move receipt {} from {} to {}",
                current.reference, status, new_status
            )));
        }

        let result = receipt::Entity::update_many()
            .col_expr(
                receipt::Column::Status,
                Expr::value(new_status.to_string()),
            )
            .col_expr(receipt::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(receipt::Column::Id.eq(id))
            .filter(receipt::Column::Status.eq(status.to_string()))
            .exec(conn)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::Conflict(format!(
                "receipt {} was updated concurrently",
                current.reference
            )));
        }

        self.event_sender.emit(Event::DocumentStatusChanged {
            document_id: id,
            document_type: DocumentKind::Receipt.as_str().to_string(),
            reference: current.reference.clone(),
            old_status: status.to_string(),
            new_status: new_status.to_string(),
        });

        self.fetch(id).await
    }

    /// Validates a Ready receipt: flips it to Done and appends one positive
    /// ledger entry per item, all in one transaction.
    #[instrument(skip(self))]
    pub async fn validate(
        &self,
        id: Uuid,
        validated_by: Uuid,
    ) -> Result<receipt::Model, ServiceError> {
        let db = self.db_pool.clone();
        let (updated, events) = db
            .transaction::<_, (receipt::Model, Vec<Event>), ServiceError>(move |txn| {
                Box::pin(async move {
                    let header = receipt::Entity::find_by_id(id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Receipt {} not found", id))
                        })?;
                    let status = DocumentStatus::parse(&header.status)?;
                    if status != DocumentStatus::Ready {
                        return Err(ServiceError::InvalidStatus(format!(
                            "receipt {} is {}, only Ready receipts can be validated",
                            header.reference, status
                        )));
                    }

                    let now = Utc::now();
                    // Compare-and-set guards against a concurrent validation
                    // of the same document.
                    let result = receipt::Entity::update_many()
                        .col_expr(
                            receipt::Column::Status,
                            Expr::value(DocumentStatus::Done.to_string()),
                        )
                        .col_expr(receipt::Column::ValidatedAt, Expr::value(now))
                        .col_expr(receipt::Column::ValidatedBy, Expr::value(validated_by))
                        .col_expr(receipt::Column::UpdatedAt, Expr::value(now))
                        .filter(receipt::Column::Id.eq(id))
                        .filter(receipt::Column::Status.eq(status.to_string()))
                        .exec(txn)
                        .await?;
                    if result.rows_affected == 0 {
                        return Err(ServiceError::Conflict(format!(
                            "receipt {} was validated concurrently",
                            header.reference
                        )));
                    }

                    let items = receipt_item::Entity::find()
                        .filter(receipt_item::Column::ReceiptId.eq(id))
                        .all(txn)
                        .await?;

                    let pairs: Vec<(Uuid, Uuid)> = items
                        .iter()
                        .map(|i| (i.product_id, header.location_id))
                        .collect();
                    for (product_id, location_id) in stock::canonical_lock_order(&pairs) {
                        stock::lock_pair(txn, product_id, location_id).await?;
                    }

                    let mut events = Vec::with_capacity(items.len() + 1);
                    for item in &items {
                        stock::record_movement(
                            txn,
                            stock::NewMovement {
                                product_id: item.product_id,
                                warehouse_id: header.warehouse_id,
                                location_id: header.location_id,
                                quantity: item.quantity,
                                transaction_type:
                                    crate::services::documents::TransactionType::Receipt,
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
                            quantity_delta: item.quantity,
                            on_hand,
                            reference: header.reference.clone(),
                        });
                    }
                    events.push(Event::DocumentValidated {
                        document_id: header.id,
                        document_type: DocumentKind::Receipt.as_str().to_string(),
                        reference: header.reference.clone(),
                        validated_by,
                        validated_at: now,
                    });

                    let updated = receipt::Entity::find_by_id(id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Receipt {} not found", id))
                        })?;
                    Ok((updated, events))
                })
            })
            .await
            .map_err(unwrap_txn_err)?;

        info!(reference = %updated.reference, "receipt validated");
        for event in events {
            self.event_sender.emit(event);
        }

        Ok(updated)
    }

    pub async fn list(
        &self,
        filters: DocumentFilters,
    ) -> Result<(Vec<receipt::Model>, u64), ServiceError> {
        let per_page = filters.per_page.clamp(1, 200);
        let page = filters.page.max(1);

        let mut query = receipt::Entity::find().order_by_desc(receipt::Column::CreatedAt);
        if let Some(status) = filters.status {
            query = query.filter(receipt::Column::Status.eq(status.to_string()));
        }
        if let Some(warehouse_id) = filters.warehouse_id {
            query = query.filter(receipt::Column::WarehouseId.eq(warehouse_id));
        }
        if let Some(search) = &filters.search {
            query = query.filter(
                Condition::any()
                    .add(receipt::Column::Reference.contains(search))
                    .add(receipt::Column::ReceiveFrom.contains(search)),
            );
        }

        let paginator = query.paginate(self.db_pool.as_ref(), per_page);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page - 1).await?;
        Ok((rows, total))
    }

    pub async fn get(&self, id: Uuid) -> Result<ReceiptDetail, ServiceError> {
        let conn = self.db_pool.as_ref();
        let header = self.fetch(id).await?;

        let items = receipt_item::Entity::find()
            .filter(receipt_item::Column::ReceiptId.eq(id))
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
                ReceiptItemDetail {
                    product_name: product.map(|p| p.name.clone()).unwrap_or_default(),
                    sku: product.map(|p| p.sku.clone()).unwrap_or_default(),
                    item,
                }
            })
            .collect();

        Ok(ReceiptDetail {
            receipt: header,
            warehouse_name,
            location_name,
            items,
        })
    }

    async fn fetch(&self, id: Uuid) -> Result<receipt::Model, ServiceError> {
        receipt::Entity::find_by_id(id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Receipt {} not found", id)))
    }
}

pub(crate) fn unwrap_txn_err(e: TransactionError<ServiceError>) -> ServiceError {
    match e {
        TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
        TransactionError::Transaction(service_err) => service_err,
    }
}
