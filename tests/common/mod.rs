#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use tokio::sync::mpsc;
use uuid::Uuid;

use warehouse_api::{
    db::{establish_connection_with_config, run_migrations, DbConfig, DbPool},
    entities::{location, product, warehouse},
    events::{self, Event, EventSender},
    services::{
        deliveries::DeliveryService, documents::ItemInput, receipts::ReceiptService,
        stock::StockService, transfers::TransferService,
    },
};

/// Acting user recorded on documents created by the tests.
pub const TEST_USER: Uuid = Uuid::from_u128(0x1111_2222_3333_4444_5555_6666_7777_8888);

/// Test harness backed by an in-memory SQLite database.
///
/// A single pooled connection keeps every query on the same in-memory
/// database; SQLite serializes writers, so the Postgres-only row locks
/// are not needed for correctness here.
pub struct TestCtx {
    pub db: Arc<DbPool>,
    pub events: EventSender,
    pub receipts: ReceiptService,
    pub deliveries: DeliveryService,
    pub transfers: TransferService,
    pub stock: StockService,
    event_rx: mpsc::Receiver<Event>,
}

impl TestCtx {
    pub async fn new() -> Self {
        let config = DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            ..Default::default()
        };
        let pool = establish_connection_with_config(&config)
            .await
            .expect("failed to open in-memory database");
        run_migrations(&pool).await.expect("migrations failed");

        let db = Arc::new(pool);
        let (events, event_rx) = events::channel(64);
        let threshold = Decimal::from(10);

        Self {
            receipts: ReceiptService::new(db.clone(), events.clone()),
            deliveries: DeliveryService::new(db.clone(), events.clone(), threshold),
            transfers: TransferService::new(db.clone(), events.clone()),
            stock: StockService::new(db.clone(), events.clone()),
            db,
            events,
            event_rx,
        }
    }

    /// Takes every event currently queued on the channel. Events are only
    /// queued after the producing transaction commits.
    pub fn drain_events(&mut self) -> Vec<Event> {
        let mut drained = Vec::new();
        while let Ok(event) = self.event_rx.try_recv() {
            drained.push(event);
        }
        drained
    }
}

pub async fn seed_warehouse(db: &DbPool, short_code: &str) -> warehouse::Model {
    let now = Utc::now();
    warehouse::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(format!("{} warehouse", short_code)),
        short_code: Set(short_code.to_string()),
        address: Set("1 Dock Road".to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("failed to seed warehouse")
}

pub async fn seed_location(db: &DbPool, warehouse_id: Uuid, short_code: &str) -> location::Model {
    let now = Utc::now();
    location::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(format!("{} shelf", short_code)),
        short_code: Set(short_code.to_string()),
        warehouse_id: Set(warehouse_id),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("failed to seed location")
}

pub async fn seed_product(db: &DbPool, sku: &str, name: &str) -> product::Model {
    let now = Utc::now();
    product::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        sku: Set(sku.to_string()),
        category_id: Set(None),
        unit_of_measure: Set("unit".to_string()),
        unit_cost: Set(Decimal::ZERO),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("failed to seed product")
}

pub fn item(product_id: Uuid, quantity: i64) -> ItemInput {
    ItemInput {
        product_id,
        quantity: Decimal::from(quantity),
        unit_cost: None,
    }
}
