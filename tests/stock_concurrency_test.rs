mod common;

use std::collections::BTreeSet;

use chrono::Utc;
use rust_decimal::Decimal;

use common::{item, seed_location, seed_product, seed_warehouse, TestCtx, TEST_USER};
use warehouse_api::{
    errors::ServiceError,
    services::{
        deliveries::CreateDeliveryInput, documents::DocumentStatus, receipts::CreateReceiptInput,
        stock::on_hand,
    },
};

#[tokio::test]
async fn concurrent_validations_cannot_oversell() {
    let ctx = TestCtx::new().await;
    let wh = seed_warehouse(&ctx.db, "WH").await;
    let loc = seed_location(&ctx.db, wh.id, "A1").await;
    let prod = seed_product(&ctx.db, "SKU-001", "Widget").await;

    ctx.stock
        .set_level(prod.id, loc.id, Decimal::from(5), TEST_USER)
        .await
        .unwrap();

    // Each delivery fits on its own; together they exceed the stock.
    let mut ids = Vec::new();
    for quantity in [4, 3] {
        let delivery = ctx
            .deliveries
            .create(
                CreateDeliveryInput {
                    delivery_address: "12 Customer Lane".to_string(),
                    warehouse_id: wh.id,
                    location_id: loc.id,
                    schedule_date: Utc::now(),
                    operation_type: None,
                    items: vec![item(prod.id, quantity)],
                },
                TEST_USER,
            )
            .await
            .unwrap();
        ctx.deliveries
            .set_status(delivery.id, DocumentStatus::Ready)
            .await
            .unwrap();
        ids.push(delivery.id);
    }

    let mut handles = Vec::new();
    for id in ids {
        let deliveries = ctx.deliveries.clone();
        handles.push(tokio::spawn(async move {
            deliveries.validate(id, TEST_USER).await
        }));
    }

    let mut validated = 0;
    let mut short = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => validated += 1,
            Err(ServiceError::InsufficientStock(_)) => short += 1,
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }

    assert_eq!(validated, 1);
    assert_eq!(short, 1);
    let remaining = on_hand(ctx.db.as_ref(), prod.id, loc.id).await.unwrap();
    assert!(remaining >= Decimal::ZERO);
}

#[tokio::test]
async fn concurrent_creations_get_distinct_references() {
    let ctx = TestCtx::new().await;
    let wh = seed_warehouse(&ctx.db, "WH").await;
    let loc = seed_location(&ctx.db, wh.id, "A1").await;
    let prod = seed_product(&ctx.db, "SKU-001", "Widget").await;

    let mut handles = Vec::new();
    for _ in 0..5 {
        let receipts = ctx.receipts.clone();
        let input = CreateReceiptInput {
            receive_from: "ACME Supply".to_string(),
            warehouse_id: wh.id,
            location_id: loc.id,
            schedule_date: Utc::now(),
            items: vec![item(prod.id, 1)],
        };
        handles.push(tokio::spawn(
            async move { receipts.create(input, TEST_USER).await },
        ));
    }

    let mut references = BTreeSet::new();
    for handle in handles {
        let receipt = handle.await.unwrap().unwrap();
        references.insert(receipt.reference);
    }

    let expected: BTreeSet<String> = (1..=5).map(|n| format!("WH/IN/{:04}", n)).collect();
    assert_eq!(references, expected);
}
