//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use api::routes::AppState;
use api::sessions::SessionLimits;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use cart_store::InMemoryCartStore;
use checkout::InMemoryOrderRepository;
use domain::PricingConfig;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> Router {
    setup_with_state().0
}

fn setup_with_state() -> (Router, Arc<AppState<InMemoryCartStore, InMemoryOrderRepository>>) {
    let state = api::create_default_state(InMemoryCartStore::new(), PricingConfig::default());
    let app = api::create_app(state.clone(), get_metrics_handle());
    (app, state)
}

const SESSION: &str = "session-abc";
const CUSTOMER: &str = "5f0c1a9e-3b59-4c1e-9a51-2d8c1e7b6f10";

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    headers: &[(&str, &str)],
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

async fn cart_call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    send(app, method, uri, &[("x-cart-session", SESSION)], body).await
}

fn item(product_id: &str, price: i64, count_in_stock: u32) -> Value {
    json!({
        "product_id": product_id,
        "name": format!("Product {product_id}"),
        "slug": product_id,
        "category": "Home",
        "image": format!("/images/{product_id}.jpg"),
        "price": price,
        "quantity": 1,
        "count_in_stock": count_in_stock,
    })
}

fn address() -> Value {
    json!({
        "full_name": "Margaret Hamilton",
        "street": "1 Apollo Way",
        "city": "Houston",
        "postal_code": "77058",
        "province": "TX",
        "phone": "555-0169",
        "country": "US",
    })
}

async fn ready_cart(app: &Router) {
    let (status, _) = cart_call(
        app,
        "POST",
        "/cart/items",
        Some(json!({ "item": item("kettle", 3999, 4), "quantity": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    cart_call(app, "PUT", "/cart/shipping-address", Some(address())).await;
    cart_call(
        app,
        "PUT",
        "/cart/payment-method",
        Some(json!({ "payment_method": "PayPal" })),
    )
    .await;
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();

    let (status, json) = send(&app, "GET", "/health", &[], None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["open_sessions"], 0);
}

#[tokio::test]
async fn test_delivery_tiers() {
    let app = setup();

    let (status, json) = send(&app, "GET", "/delivery-tiers", &[], None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["tax_rate_bps"], 1500);
    assert_eq!(json["default_tier_index"], 2);
    assert_eq!(json["delivery_tiers"][0]["name"], "Tomorrow");
    assert_eq!(json["delivery_tiers"][2]["free_shipping_minimum_price"], 3500);
}

#[tokio::test]
async fn test_cart_requires_session_header() {
    let app = setup();

    let (status, json) = send(&app, "GET", "/cart", &[], None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("x-cart-session"));
}

#[tokio::test]
async fn test_empty_cart() {
    let app = setup();

    let (status, json) = cart_call(&app, "GET", "/cart", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["session"], SESSION);
    assert_eq!(json["items"], json!([]));
    assert_eq!(json["total_price"], 0);
    assert_eq!(json["shipping_price"], 0);
    assert!(json.get("persistence").is_none());
}

#[tokio::test]
async fn test_add_item_reprices() {
    let app = setup();

    let (status, json) = cart_call(
        &app,
        "POST",
        "/cart/items",
        Some(json!({ "item": item("kettle", 3999, 4), "quantity": 2 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["items"][0]["quantity"], 2);
    assert_eq!(json["items_price"], 7998);
    // 7998 * 15% = 1199.7
    assert_eq!(json["tax_price"], 1200);
    assert_eq!(json["total_price"], 9198);
    assert_eq!(json["persistence"], "saved");
    assert_eq!(json["revision"], 1);
    assert_eq!(json["client_id"], json["items"][0]["client_id"]);
}

#[tokio::test]
async fn test_shipping_and_tier_selection() {
    let app = setup();
    cart_call(
        &app,
        "POST",
        "/cart/items",
        Some(json!({ "item": item("mug", 1250, 10), "quantity": 1 })),
    )
    .await;

    let (_, json) = cart_call(&app, "PUT", "/cart/shipping-address", Some(address())).await;
    assert_eq!(json["shipping_price"], 490);
    assert_eq!(json["delivery_tier"]["name"], "Next 5 Days");

    let (status, json) = cart_call(
        &app,
        "PUT",
        "/cart/delivery-tier",
        Some(json!({ "index": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["delivery_tier_index"], 0);
    assert_eq!(json["shipping_price"], 1290);
    assert_eq!(json["total_price"], 1250 + 1290 + 188);
}

#[tokio::test]
async fn test_cart_rule_violations_are_unprocessable() {
    let app = setup();

    let (status, _) = cart_call(
        &app,
        "POST",
        "/cart/items",
        Some(json!({ "item": item("lamp", 2999, 1), "quantity": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = cart_call(
        &app,
        "POST",
        "/cart/items",
        Some(json!({ "item": item("lamp", 2999, 1), "quantity": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, json) = cart_call(
        &app,
        "PUT",
        "/cart/delivery-tier",
        Some(json!({ "index": 9 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["error"].as_str().unwrap().contains('9'));
}

#[tokio::test]
async fn test_oversized_price_is_unprocessable() {
    let app = setup();

    let (status, json) = cart_call(
        &app,
        "POST",
        "/cart/items",
        Some(json!({ "item": item("gold", i64::MAX / 2, 10), "quantity": 3 })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["error"].as_str().unwrap().contains("overflow"));

    let (_, cart) = cart_call(&app, "GET", "/cart", None).await;
    assert_eq!(cart["items"], json!([]));
}

#[tokio::test]
async fn test_update_and_remove_item() {
    let app = setup();
    cart_call(
        &app,
        "POST",
        "/cart/items",
        Some(json!({ "item": item("mug", 1250, 10), "quantity": 1 })),
    )
    .await;

    let (status, json) = cart_call(
        &app,
        "PUT",
        "/cart/items",
        Some(json!({ "item": item("mug", 1250, 10), "quantity": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["items"][0]["quantity"], 4);
    assert_eq!(json["items_price"], 5000);

    let (status, json) = cart_call(
        &app,
        "PUT",
        "/cart/items",
        Some(json!({ "item": item("tea", 500, 10), "quantity": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["persistence"], "skipped");

    let (status, json) = cart_call(
        &app,
        "DELETE",
        "/cart/items",
        Some(json!({ "product_id": "mug" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["items"], json!([]));
    assert_eq!(json["items_price"], 0);
}

#[tokio::test]
async fn test_clear_cart_keeps_selections() {
    let app = setup();
    ready_cart(&app).await;

    let (status, json) = cart_call(&app, "DELETE", "/cart", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["items"], json!([]));
    assert_eq!(json["items_price"], 0);
    assert_eq!(json["shipping_price"], 0);
    assert_eq!(json["tax_price"], 0);
    assert_eq!(json["total_price"], 0);
    assert_eq!(json["payment_method"], "PayPal");
    assert_eq!(json["shipping_address"]["city"], "Houston");
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let app = setup();
    ready_cart(&app).await;

    let (_, json) = send(
        &app,
        "GET",
        "/cart",
        &[("x-cart-session", "someone-else")],
        None,
    )
    .await;

    assert_eq!(json["items"], json!([]));
}

#[tokio::test]
async fn test_checkout_requires_customer() {
    let app = setup();
    ready_cart(&app).await;

    let (status, _) = cart_call(&app, "POST", "/checkout", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        "POST",
        "/checkout",
        &[("x-cart-session", SESSION), ("x-customer-id", "not-a-uuid")],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_checkout_places_order_and_clears_cart() {
    let (app, state) = setup_with_state();
    ready_cart(&app).await;

    let (status, order) = send(
        &app,
        "POST",
        "/checkout",
        &[("x-cart-session", SESSION), ("x-customer-id", CUSTOMER)],
        None,
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    // 3999 + 0 shipping (free over 3500) + 600 tax (599.85 rounded)
    assert_eq!(order["items_price"], 3999);
    assert_eq!(order["shipping_price"], 0);
    assert_eq!(order["tax_price"], 600);
    assert_eq!(order["total_price"], 4599);
    assert_eq!(order["is_paid"], false);
    assert_eq!(order["payment_method"], "PayPal");

    let (_, cart) = cart_call(&app, "GET", "/cart", None).await;
    assert_eq!(cart["items"], json!([]));

    let id = order["id"].as_str().unwrap();
    let uri = format!("/orders/{id}");
    let (status, fetched) = send(&app, "GET", &uri, &[("x-customer-id", CUSTOMER)], None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, order);

    let other = "0b6f3e2a-8d44-4b8e-a7a6-1c9e2f3d4b5a";
    let (status, _) = send(&app, "GET", &uri, &[("x-customer-id", other)], None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, orders) = send(&app, "GET", "/orders", &[("x-customer-id", CUSTOMER)], None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(orders.as_array().unwrap().len(), 1);

    assert_eq!(state.handoff.repository().order_count().await, 1);
}

#[tokio::test]
async fn test_checkout_incomplete_cart_lists_violations() {
    let app = setup();
    cart_call(
        &app,
        "POST",
        "/cart/items",
        Some(json!({ "item": item("mug", 1250, 10), "quantity": 1 })),
    )
    .await;

    let (status, json) = send(
        &app,
        "POST",
        "/checkout",
        &[("x-cart-session", SESSION), ("x-customer-id", CUSTOMER)],
        None,
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let fields: Vec<&str> = json["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["shipping_address", "payment_method", "shipping_price"]);

    let (_, cart) = cart_call(&app, "GET", "/cart", None).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_order_lookup_rejects_bad_id() {
    let app = setup();

    let (status, _) = send(
        &app,
        "GET",
        "/orders/not-a-uuid",
        &[("x-customer-id", CUSTOMER)],
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup();
    cart_call(
        &app,
        "POST",
        "/cart/items",
        Some(json!({ "item": item("mug", 1250, 10), "quantity": 1 })),
    )
    .await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("cart_mutations_total"));
}

#[tokio::test]
async fn test_idle_sessions_are_evicted_and_rehydrate() {
    let state = api::create_state(
        InMemoryCartStore::new(),
        InMemoryOrderRepository::new(),
        PricingConfig::default(),
        SessionLimits {
            idle_timeout: Duration::ZERO,
            max_sessions: 100,
        },
    );
    let app = api::create_app(state.clone(), get_metrics_handle());
    ready_cart(&app).await;
    assert_eq!(state.sessions.len().await, 1);

    let eviction = api::spawn_session_eviction(&state, Duration::from_millis(10));
    tokio::time::sleep(Duration::from_millis(50)).await;
    eviction.abort();
    assert!(state.sessions.is_empty().await);

    let (status, cart) = cart_call(&app, "GET", "/cart", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["items"][0]["product_id"], "kettle");
    assert_eq!(cart["payment_method"], "PayPal");
}
