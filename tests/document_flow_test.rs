mod common;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use common::{item, seed_location, seed_product, seed_warehouse, TestCtx, TEST_USER};
use warehouse_api::{
    entities::stock_ledger,
    errors::ServiceError,
    events::Event,
    services::{
        dashboard::DashboardService,
        deliveries::CreateDeliveryInput,
        documents::DocumentStatus,
        receipts::CreateReceiptInput,
        stock::on_hand,
        transfers::CreateTransferInput,
    },
};

fn receipt_input(warehouse_id: Uuid, location_id: Uuid, items: Vec<warehouse_api::services::documents::ItemInput>) -> CreateReceiptInput {
    CreateReceiptInput {
        receive_from: "ACME Supply".to_string(),
        warehouse_id,
        location_id,
        schedule_date: Utc::now(),
        items,
    }
}

fn delivery_input(warehouse_id: Uuid, location_id: Uuid, items: Vec<warehouse_api::services::documents::ItemInput>) -> CreateDeliveryInput {
    CreateDeliveryInput {
        delivery_address: "12 Customer Lane".to_string(),
        warehouse_id,
        location_id,
        schedule_date: Utc::now(),
        operation_type: None,
        items,
    }
}

#[tokio::test]
async fn receipt_lifecycle_adds_stock() {
    let ctx = TestCtx::new().await;
    let wh = seed_warehouse(&ctx.db, "WH").await;
    let loc = seed_location(&ctx.db, wh.id, "A1").await;
    let prod = seed_product(&ctx.db, "SKU-001", "Widget").await;

    let created = ctx
        .receipts
        .create(receipt_input(wh.id, loc.id, vec![item(prod.id, 5)]), TEST_USER)
        .await
        .unwrap();
    assert_eq!(created.reference, "WH/IN/0001");
    assert_eq!(created.status, "Draft");
    assert!(created.validated_at.is_none());

    // No stock moves before validation.
    assert_eq!(
        on_hand(ctx.db.as_ref(), prod.id, loc.id).await.unwrap(),
        Decimal::ZERO
    );

    ctx.receipts
        .set_status(created.id, DocumentStatus::Ready)
        .await
        .unwrap();
    let done = ctx.receipts.validate(created.id, TEST_USER).await.unwrap();

    assert_eq!(done.status, "Done");
    assert_eq!(done.validated_by, Some(TEST_USER));
    assert!(done.validated_at.is_some());
    assert_eq!(
        on_hand(ctx.db.as_ref(), prod.id, loc.id).await.unwrap(),
        Decimal::from(5)
    );
}

#[tokio::test]
async fn references_are_serial_per_warehouse_and_kind() {
    let ctx = TestCtx::new().await;
    let wh = seed_warehouse(&ctx.db, "WH").await;
    let other = seed_warehouse(&ctx.db, "DC").await;
    let loc = seed_location(&ctx.db, wh.id, "A1").await;
    let other_loc = seed_location(&ctx.db, other.id, "B1").await;
    let prod = seed_product(&ctx.db, "SKU-001", "Widget").await;

    let r1 = ctx
        .receipts
        .create(receipt_input(wh.id, loc.id, vec![item(prod.id, 1)]), TEST_USER)
        .await
        .unwrap();
    let r2 = ctx
        .receipts
        .create(receipt_input(wh.id, loc.id, vec![item(prod.id, 1)]), TEST_USER)
        .await
        .unwrap();
    assert_eq!(r1.reference, "WH/IN/0001");
    assert_eq!(r2.reference, "WH/IN/0002");

    // A different kind and a different warehouse each get their own counter.
    ctx.stock
        .set_level(prod.id, loc.id, Decimal::from(10), TEST_USER)
        .await
        .unwrap();
    let d1 = ctx
        .deliveries
        .create(delivery_input(wh.id, loc.id, vec![item(prod.id, 1)]), TEST_USER)
        .await
        .unwrap();
    assert_eq!(d1.reference, "WH/OUT/0001");

    let r3 = ctx
        .receipts
        .create(
            receipt_input(other.id, other_loc.id, vec![item(prod.id, 1)]),
            TEST_USER,
        )
        .await
        .unwrap();
    assert_eq!(r3.reference, "DC/IN/0001");
}

#[tokio::test]
async fn delivery_creation_rejects_shortage_with_itemized_report() {
    let ctx = TestCtx::new().await;
    let wh = seed_warehouse(&ctx.db, "WH").await;
    let loc = seed_location(&ctx.db, wh.id, "A1").await;
    let widget = seed_product(&ctx.db, "SKU-001", "Widget").await;
    let gadget = seed_product(&ctx.db, "SKU-002", "Gadget").await;

    ctx.stock
        .set_level(widget.id, loc.id, Decimal::from(2), TEST_USER)
        .await
        .unwrap();

    let err = ctx
        .deliveries
        .create(
            delivery_input(wh.id, loc.id, vec![item(widget.id, 5), item(gadget.id, 3)]),
            TEST_USER,
        )
        .await
        .unwrap_err();

    match err {
        ServiceError::InsufficientStock(report) => {
            assert_eq!(report.0.len(), 2);
            let widget_row = report
                .0
                .iter()
                .find(|s| s.product_id == widget.id)
                .unwrap();
            assert_eq!(widget_row.product_name, "Widget");
            assert_eq!(widget_row.requested_quantity, Decimal::from(5));
            assert_eq!(widget_row.available_quantity, Decimal::from(2));
            let gadget_row = report
                .0
                .iter()
                .find(|s| s.product_id == gadget.id)
                .unwrap();
            assert_eq!(gadget_row.available_quantity, Decimal::ZERO);
        }
        other => panic!("expected InsufficientStock, got {:?}", other),
    }

    // Nothing was persisted.
    assert_eq!(
        on_hand(ctx.db.as_ref(), widget.id, loc.id).await.unwrap(),
        Decimal::from(2)
    );
}

#[tokio::test]
async fn delivery_validation_deducts_stock() {
    let ctx = TestCtx::new().await;
    let wh = seed_warehouse(&ctx.db, "WH").await;
    let loc = seed_location(&ctx.db, wh.id, "A1").await;
    let prod = seed_product(&ctx.db, "SKU-001", "Widget").await;

    ctx.stock
        .set_level(prod.id, loc.id, Decimal::from(10), TEST_USER)
        .await
        .unwrap();

    let created = ctx
        .deliveries
        .create(delivery_input(wh.id, loc.id, vec![item(prod.id, 4)]), TEST_USER)
        .await
        .unwrap();
    ctx.deliveries
        .set_status(created.id, DocumentStatus::Waiting)
        .await
        .unwrap();
    ctx.deliveries
        .set_status(created.id, DocumentStatus::Ready)
        .await
        .unwrap();
    let done = ctx
        .deliveries
        .validate(created.id, TEST_USER)
        .await
        .unwrap();

    assert_eq!(done.status, "Done");
    assert_eq!(
        on_hand(ctx.db.as_ref(), prod.id, loc.id).await.unwrap(),
        Decimal::from(6)
    );
}

#[tokio::test]
async fn delivery_validation_recheck_catches_stock_consumed_after_creation() {
    let ctx = TestCtx::new().await;
    let wh = seed_warehouse(&ctx.db, "WH").await;
    let loc = seed_location(&ctx.db, wh.id, "A1").await;
    let prod = seed_product(&ctx.db, "SKU-001", "Widget").await;

    ctx.stock
        .set_level(prod.id, loc.id, Decimal::from(5), TEST_USER)
        .await
        .unwrap();

    let delivery = ctx
        .deliveries
        .create(delivery_input(wh.id, loc.id, vec![item(prod.id, 5)]), TEST_USER)
        .await
        .unwrap();
    ctx.deliveries
        .set_status(delivery.id, DocumentStatus::Ready)
        .await
        .unwrap();

    // Stock disappears between creation and validation.
    ctx.stock
        .set_level(prod.id, loc.id, Decimal::from(1), TEST_USER)
        .await
        .unwrap();

    let err = ctx
        .deliveries
        .validate(delivery.id, TEST_USER)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientStock(_)));

    // The document stayed Ready and no ledger entry was written for it.
    let still_ready = ctx.deliveries.get(delivery.id).await.unwrap();
    assert_eq!(still_ready.delivery.status, "Ready");
    assert_eq!(
        on_hand(ctx.db.as_ref(), prod.id, loc.id).await.unwrap(),
        Decimal::from(1)
    );
}

#[tokio::test]
async fn low_stock_event_fires_only_below_the_threshold() {
    // Harness threshold is 10.
    let mut ctx = TestCtx::new().await;
    let wh = seed_warehouse(&ctx.db, "WH").await;
    let loc = seed_location(&ctx.db, wh.id, "A1").await;
    let widget = seed_product(&ctx.db, "SKU-001", "Widget").await;
    let gadget = seed_product(&ctx.db, "SKU-002", "Gadget").await;

    ctx.stock
        .set_level(widget.id, loc.id, Decimal::from(13), TEST_USER)
        .await
        .unwrap();
    ctx.stock
        .set_level(gadget.id, loc.id, Decimal::from(12), TEST_USER)
        .await
        .unwrap();

    // Landing exactly on the threshold is not low stock.
    let at_boundary = ctx
        .deliveries
        .create(delivery_input(wh.id, loc.id, vec![item(widget.id, 3)]), TEST_USER)
        .await
        .unwrap();
    ctx.deliveries
        .set_status(at_boundary.id, DocumentStatus::Ready)
        .await
        .unwrap();
    ctx.deliveries.validate(at_boundary.id, TEST_USER).await.unwrap();

    let events = ctx.drain_events();
    assert!(
        !events.iter().any(|e| matches!(e, Event::LowStock { .. })),
        "on-hand of 10 must not raise a low-stock alert"
    );
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::StockChanged { .. })));

    // Dropping to 9 does.
    let below = ctx
        .deliveries
        .create(delivery_input(wh.id, loc.id, vec![item(gadget.id, 3)]), TEST_USER)
        .await
        .unwrap();
    ctx.deliveries
        .set_status(below.id, DocumentStatus::Ready)
        .await
        .unwrap();
    ctx.deliveries.validate(below.id, TEST_USER).await.unwrap();

    let alerts: Vec<Event> = ctx
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, Event::LowStock { .. }))
        .collect();
    assert_eq!(alerts.len(), 1);
    match &alerts[0] {
        Event::LowStock {
            product_id,
            location_id,
            on_hand,
            threshold,
            ..
        } => {
            assert_eq!(*product_id, gadget.id);
            assert_eq!(*location_id, loc.id);
            assert_eq!(*on_hand, Decimal::from(9));
            assert_eq!(*threshold, Decimal::from(10));
        }
        other => panic!("expected a low-stock event, got {:?}", other),
    }

    // The dashboard applies the same strict bound: 9 is listed, 10 is not.
    let dashboard = DashboardService::new(ctx.db.clone(), ctx.stock.clone(), Decimal::from(10));
    let rows = dashboard.low_stock().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].product_id, gadget.id);
    assert_eq!(rows[0].on_hand, Decimal::from(9));
}

#[tokio::test]
async fn waiting_is_rejected_for_receipts_and_transfers() {
    let ctx = TestCtx::new().await;
    let wh = seed_warehouse(&ctx.db, "WH").await;
    let loc = seed_location(&ctx.db, wh.id, "A1").await;
    let prod = seed_product(&ctx.db, "SKU-001", "Widget").await;

    let receipt = ctx
        .receipts
        .create(receipt_input(wh.id, loc.id, vec![item(prod.id, 1)]), TEST_USER)
        .await
        .unwrap();
    let err = ctx
        .receipts
        .set_status(receipt.id, DocumentStatus::Waiting)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidStatus(_)));
}

#[tokio::test]
async fn backward_and_terminal_moves_are_rejected() {
    let ctx = TestCtx::new().await;
    let wh = seed_warehouse(&ctx.db, "WH").await;
    let loc = seed_location(&ctx.db, wh.id, "A1").await;
    let prod = seed_product(&ctx.db, "SKU-001", "Widget").await;

    let receipt = ctx
        .receipts
        .create(receipt_input(wh.id, loc.id, vec![item(prod.id, 1)]), TEST_USER)
        .await
        .unwrap();

    // Done is reserved for validation.
    let err = ctx
        .receipts
        .set_status(receipt.id, DocumentStatus::Done)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidStatus(_)));

    ctx.receipts
        .set_status(receipt.id, DocumentStatus::Ready)
        .await
        .unwrap();
    let err = ctx
        .receipts
        .set_status(receipt.id, DocumentStatus::Draft)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidStatus(_)));

    // Validate, then confirm Done is terminal.
    ctx.receipts.validate(receipt.id, TEST_USER).await.unwrap();
    let err = ctx
        .receipts
        .set_status(receipt.id, DocumentStatus::Ready)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidStatus(_)));
    let err = ctx.receipts.validate(receipt.id, TEST_USER).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidStatus(_)));
}

#[tokio::test]
async fn receipts_and_deliveries_validate_only_from_ready() {
    let ctx = TestCtx::new().await;
    let wh = seed_warehouse(&ctx.db, "WH").await;
    let loc = seed_location(&ctx.db, wh.id, "A1").await;
    let prod = seed_product(&ctx.db, "SKU-001", "Widget").await;

    let receipt = ctx
        .receipts
        .create(receipt_input(wh.id, loc.id, vec![item(prod.id, 2)]), TEST_USER)
        .await
        .unwrap();
    let err = ctx.receipts.validate(receipt.id, TEST_USER).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidStatus(_)));

    // Nothing hit the ledger.
    assert_eq!(
        on_hand(ctx.db.as_ref(), prod.id, loc.id).await.unwrap(),
        Decimal::ZERO
    );
}

#[tokio::test]
async fn transfer_moves_stock_between_locations() {
    let ctx = TestCtx::new().await;
    let wh = seed_warehouse(&ctx.db, "WH").await;
    let src = seed_location(&ctx.db, wh.id, "A1").await;
    let dst = seed_location(&ctx.db, wh.id, "B2").await;
    let prod = seed_product(&ctx.db, "SKU-001", "Widget").await;

    ctx.stock
        .set_level(prod.id, src.id, Decimal::from(8), TEST_USER)
        .await
        .unwrap();

    let transfer = ctx
        .transfers
        .create(
            CreateTransferInput {
                from_warehouse_id: wh.id,
                from_location_id: src.id,
                to_warehouse_id: wh.id,
                to_location_id: dst.id,
                schedule_date: Utc::now(),
                notes: None,
                items: vec![item(prod.id, 3)],
            },
            TEST_USER,
        )
        .await
        .unwrap();
    assert_eq!(transfer.reference, "WH/TR/0001");

    // Transfers may validate straight from Draft.
    let done = ctx.transfers.validate(transfer.id, TEST_USER).await.unwrap();
    assert_eq!(done.status, "Done");

    assert_eq!(
        on_hand(ctx.db.as_ref(), prod.id, src.id).await.unwrap(),
        Decimal::from(5)
    );
    assert_eq!(
        on_hand(ctx.db.as_ref(), prod.id, dst.id).await.unwrap(),
        Decimal::from(3)
    );

    // Both legs share the transfer's reference.
    let legs = stock_ledger::Entity::find()
        .filter(stock_ledger::Column::Reference.eq("WH/TR/0001"))
        .all(ctx.db.as_ref())
        .await
        .unwrap();
    assert_eq!(legs.len(), 2);
    let total: Decimal = legs.iter().map(|entry| entry.quantity).sum();
    assert_eq!(total, Decimal::ZERO);

    // Done transfers cannot be validated again.
    let err = ctx.transfers.validate(transfer.id, TEST_USER).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidStatus(_)));
}

#[tokio::test]
async fn transfer_to_same_location_is_rejected() {
    let ctx = TestCtx::new().await;
    let wh = seed_warehouse(&ctx.db, "WH").await;
    let loc = seed_location(&ctx.db, wh.id, "A1").await;
    let prod = seed_product(&ctx.db, "SKU-001", "Widget").await;

    let err = ctx
        .transfers
        .create(
            CreateTransferInput {
                from_warehouse_id: wh.id,
                from_location_id: loc.id,
                to_warehouse_id: wh.id,
                to_location_id: loc.id,
                schedule_date: Utc::now(),
                notes: None,
                items: vec![item(prod.id, 1)],
            },
            TEST_USER,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn empty_and_unknown_product_documents_are_rejected() {
    let ctx = TestCtx::new().await;
    let wh = seed_warehouse(&ctx.db, "WH").await;
    let loc = seed_location(&ctx.db, wh.id, "A1").await;

    let err = ctx
        .receipts
        .create(receipt_input(wh.id, loc.id, vec![]), TEST_USER)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));

    let err = ctx
        .receipts
        .create(
            receipt_input(wh.id, loc.id, vec![item(Uuid::new_v4(), 1)]),
            TEST_USER,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn manual_stock_set_writes_adjustment_entries() {
    let ctx = TestCtx::new().await;
    let wh = seed_warehouse(&ctx.db, "WH").await;
    let loc = seed_location(&ctx.db, wh.id, "A1").await;
    let prod = seed_product(&ctx.db, "SKU-001", "Widget").await;

    let change = ctx
        .stock
        .set_level(prod.id, loc.id, Decimal::from(7), TEST_USER)
        .await
        .unwrap();
    assert_eq!(change.previous_quantity, Decimal::ZERO);
    assert_eq!(change.new_quantity, Decimal::from(7));
    assert_eq!(change.delta, Decimal::from(7));
    assert!(change.reference.as_deref().unwrap_or("").starts_with("ADJ/"));

    // Setting the same level again is a no-op with no ledger entry.
    let repeat = ctx
        .stock
        .set_level(prod.id, loc.id, Decimal::from(7), TEST_USER)
        .await
        .unwrap();
    assert!(repeat.delta.is_zero());
    assert!(repeat.reference.is_none());

    // Lowering the level appends a negative entry, never edits history.
    ctx.stock
        .set_level(prod.id, loc.id, Decimal::from(4), TEST_USER)
        .await
        .unwrap();
    let entries = stock_ledger::Entity::find()
        .filter(stock_ledger::Column::ProductId.eq(prod.id))
        .all(ctx.db.as_ref())
        .await
        .unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(
        on_hand(ctx.db.as_ref(), prod.id, loc.id).await.unwrap(),
        Decimal::from(4)
    );

    let err = ctx
        .stock
        .set_level(prod.id, loc.id, Decimal::from(-1), TEST_USER)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}
