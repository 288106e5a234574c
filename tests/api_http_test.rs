mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    routing::get,
    Router,
};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use uuid::Uuid;

use common::TestCtx;
use warehouse_api::{api_v1_routes, config::AppConfig, health_check, AppState};

fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        host: "127.0.0.1".to_string(),
        port: 18080,
        environment: "test".to_string(),
        log_level: "warn".to_string(),
        log_json: false,
        auto_migrate: false,
        db_max_connections: 1,
        db_min_connections: 1,
        db_connect_timeout_secs: 5,
        low_stock_threshold: Decimal::from(10),
        system_user_id: Uuid::from_u128(1),
        event_channel_capacity: 64,
        request_timeout_secs: 5,
    }
}

async fn test_app() -> Router {
    let ctx = TestCtx::new().await;
    let state = AppState::new(ctx.db.clone(), Arc::new(test_config()), ctx.events.clone());
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_v1_routes())
        .with_state(state)
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    use tower::ServiceExt;

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post(uri: &str, payload: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

fn put(uri: &str, payload: Value) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

fn get_req(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn data(body: &Value) -> &Value {
    assert_eq!(body["success"], json!(true), "unexpected body: {body}");
    &body["data"]
}

fn id_of(body: &Value) -> String {
    data(body)["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_endpoint_reports_database_state() {
    let app = test_app().await;
    let (status, body) = call(&app, get_req("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["checks"]["database"], json!("healthy"));
}

#[tokio::test]
async fn receipt_flow_over_http_adds_stock() {
    let app = test_app().await;

    let (status, body) = call(
        &app,
        post(
            "/api/v1/warehouses",
            json!({"name": "Main", "short_code": "WH", "address": "1 Dock Road"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let warehouse_id = id_of(&body);

    let (_, body) = call(
        &app,
        post(
            "/api/v1/locations",
            json!({"name": "Shelf A1", "short_code": "A1", "warehouse_id": warehouse_id}),
        ),
    )
    .await;
    let location_id = id_of(&body);

    let (_, body) = call(
        &app,
        post(
            "/api/v1/products",
            json!({"name": "Widget", "sku": "SKU-001", "unit_of_measure": "pcs", "unit_cost": "2.50"}),
        ),
    )
    .await;
    let product_id = id_of(&body);

    let (status, body) = call(
        &app,
        post(
            "/api/v1/receipts",
            json!({
                "receive_from": "ACME Supply",
                "warehouse_id": warehouse_id,
                "location_id": location_id,
                "schedule_date": "2026-08-23T08:00:00Z",
                "items": [{"product_id": product_id, "quantity": 5}]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&body)["reference"], json!("WH/IN/0001"));
    assert_eq!(data(&body)["status"], json!("Draft"));
    let receipt_id = id_of(&body);

    // Draft receipts cannot be validated.
    let (status, _) = call(
        &app,
        post(&format!("/api/v1/receipts/{receipt_id}/validate"), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        put(
            &format!("/api/v1/receipts/{receipt_id}/status"),
            json!({"status": "Ready"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let user = Uuid::new_v4();
    let request = Request::builder()
        .method("POST")
        .uri(format!("/api/v1/receipts/{receipt_id}/validate"))
        .header("content-type", "application/json")
        .header("x-user-id", user.to_string())
        .body(Body::from("{}"))
        .unwrap();
    let (status, body) = call(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&body)["status"], json!("Done"));
    assert_eq!(data(&body)["validated_by"], json!(user.to_string()));

    let (status, body) = call(&app, get_req("/api/v1/stock")).await;
    assert_eq!(status, StatusCode::OK);
    let rows = data(&body).as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["on_hand"], json!("5"));
    assert_eq!(rows[0]["sku"], json!("SKU-001"));

    let (status, body) = call(&app, get_req("/api/v1/movements")).await;
    assert_eq!(status, StatusCode::OK);
    let page = data(&body);
    assert_eq!(page["total"], json!(1));
    assert_eq!(page["items"][0]["reference"], json!("WH/IN/0001"));
}

#[tokio::test]
async fn delivery_shortage_is_a_422_with_details() {
    let app = test_app().await;

    let (_, body) = call(
        &app,
        post(
            "/api/v1/warehouses",
            json!({"name": "Main", "short_code": "WH", "address": "1 Dock Road"}),
        ),
    )
    .await;
    let warehouse_id = id_of(&body);
    let (_, body) = call(
        &app,
        post(
            "/api/v1/locations",
            json!({"name": "Shelf A1", "short_code": "A1", "warehouse_id": warehouse_id}),
        ),
    )
    .await;
    let location_id = id_of(&body);
    let (_, body) = call(
        &app,
        post(
            "/api/v1/products",
            json!({"name": "Widget", "sku": "SKU-001", "unit_of_measure": "pcs", "unit_cost": "2.50"}),
        ),
    )
    .await;
    let product_id = id_of(&body);

    let (status, body) = call(
        &app,
        post(
            "/api/v1/deliveries",
            json!({
                "delivery_address": "12 Customer Lane",
                "warehouse_id": warehouse_id,
                "location_id": location_id,
                "schedule_date": "2026-08-23T08:00:00Z",
                "items": [{"product_id": product_id, "quantity": 3}]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let details = body["details"].as_array().unwrap();
    assert_eq!(details.len(), 1);
    assert_eq!(details[0]["product_name"], json!("Widget"));
    assert_eq!(details[0]["requested_quantity"], json!("3"));
    assert_eq!(details[0]["available_quantity"], json!("0"));
}

#[tokio::test]
async fn malformed_user_header_is_rejected() {
    let app = test_app().await;
    let request = Request::builder()
        .method("PUT")
        .uri(format!(
            "/api/v1/stock/{}/{}",
            Uuid::new_v4(),
            Uuid::new_v4()
        ))
        .header("content-type", "application/json")
        .header("x-user-id", "not-a-uuid")
        .body(Body::from(json!({"quantity": 5}).to_string()))
        .unwrap();
    let (status, _) = call(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
