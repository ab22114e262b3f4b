//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use common::OrderId;
use domain::{OrderStatus, OrderStatusView};
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{InMemoryServices, SagaConfig};
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

struct TestApp {
    app: axum::Router,
    state: Arc<api::routes::AppState>,
    mocks: InMemoryServices,
}

impl TestApp {
    fn new() -> Self {
        let (state, mocks) =
            api::create_default_state(SagaConfig::default(), get_metrics_handle());
        let app = api::create_app(state.clone());
        Self { app, state, mocks }
    }

    async fn get(&self, uri: &str) -> Response {
        self.app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn post(&self, uri: &str, body: serde_json::Value) -> Response {
        self.app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_string(&body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn wait_for(
        &self,
        id: &str,
        condition: impl FnMut(&OrderStatusView) -> bool,
    ) {
        let mut rx = self
            .state
            .coordinator
            .subscribe_order(&OrderId::new(id))
            .unwrap();
        rx.wait_for(condition).await.unwrap();
    }

    async fn wait_for_status(&self, id: &str, status: OrderStatus) {
        self.wait_for(id, |v| v.status == status).await;
    }

    async fn wait_for_shipments(&self, id: &str, count: usize) {
        self.wait_for(id, |v| {
            v.fulfillments
                .iter()
                .filter(|f| f.shipment.is_some())
                .count()
                == count
        })
        .await;
    }
}

async fn json(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn order_body(id: &str, items: &[(&str, u32)]) -> serde_json::Value {
    let items: Vec<serde_json::Value> = items
        .iter()
        .map(|(sku, quantity)| serde_json::json!({ "sku": sku, "quantity": quantity }))
        .collect();
    serde_json::json!({ "id": id, "customerID": "customer-1", "items": items })
}

#[tokio::test]
async fn test_health_check() {
    let t = TestApp::new();

    let response = t.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["orders"], 0);
}

#[tokio::test]
async fn test_create_order() {
    let t = TestApp::new();

    let response = t
        .post("/orders", order_body("1234", &[("Hiking Boots", 2)]))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = json(response).await;
    assert_eq!(json["id"], "1234");
    assert!(json["status"].as_str().is_some());
}

#[tokio::test]
async fn test_create_order_generates_id() {
    let t = TestApp::new();

    let response = t
        .post(
            "/orders",
            serde_json::json!({
                "customerID": "customer-1",
                "items": [{ "sku": "Hiking Boots", "quantity": 1 }]
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(!json(response).await["id"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_invalid_order() {
    let t = TestApp::new();

    let response = t.post("/orders", order_body("1234", &[])).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json(response).await["error"].as_str().is_some());

    let missing_customer = t
        .post(
            "/orders",
            serde_json::json!({ "id": "1235", "items": [{ "sku": "Hiking Boots", "quantity": 1 }] }),
        )
        .await;
    assert_eq!(missing_customer.status(), StatusCode::BAD_REQUEST);

    let list = json(t.get("/orders").await).await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_order_conflicts() {
    let t = TestApp::new();
    let body = order_body("1234", &[("Adidas Classic", 1)]);

    assert_eq!(t.post("/orders", body.clone()).await.status(), StatusCode::CREATED);
    assert_eq!(t.post("/orders", body).await.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_get_nonexistent_order() {
    let t = TestApp::new();

    let response = t.get("/orders/missing").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = t.get("/shipments/missing:1").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_order_delivered_through_carrier_webhook() {
    let t = TestApp::new();
    t.post("/orders", order_body("1234", &[("Hiking Boots", 2)]))
        .await;
    t.wait_for_shipments("1234", 1).await;

    let response = t
        .post(
            "/shipments/1234:1/status",
            serde_json::json!({ "status": "dispatched" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let response = t
        .post(
            "/shipments/1234:1/status",
            serde_json::json!({ "status": "delivered" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    t.wait_for_status("1234", OrderStatus::Completed).await;

    let order = json(t.get("/orders/1234").await).await;
    assert_eq!(order["status"], "completed");
    assert_eq!(order["customerID"], "customer-1");
    let fulfillment = &order["fulfillments"][0];
    assert_eq!(fulfillment["id"], "1234:1");
    assert_eq!(fulfillment["location"], "Warehouse A");
    assert_eq!(fulfillment["status"], "completed");
    assert_eq!(fulfillment["payment"]["status"], "success");
    assert_eq!(fulfillment["shipment"]["status"], "delivered");

    let shipment = json(t.get("/shipments/1234:1").await).await;
    assert_eq!(shipment["status"], "delivered");
    assert_eq!(shipment["requestorID"], "1234");
    assert_eq!(t.mocks.payment.charge_count(), 1);
}

#[tokio::test]
async fn test_customer_cancel() {
    let t = TestApp::new();
    t.post(
        "/orders",
        order_body("1234", &[("Adidas Classic", 1), ("Nike Air", 2)]),
    )
    .await;
    t.wait_for_status("1234", OrderStatus::CustomerActionRequired)
        .await;

    let order = json(t.get("/orders/1234").await).await;
    assert_eq!(order["status"], "customerActionRequired");
    assert_eq!(order["fulfillments"][0]["status"], "unavailable");
    assert_eq!(order["fulfillments"][1]["status"], "pending");

    let response = t
        .post("/orders/1234/action", serde_json::json!({ "action": "cancel" }))
        .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    t.wait_for_status("1234", OrderStatus::Cancelled).await;
    assert_eq!(t.mocks.payment.call_count(), 0);
}

#[tokio::test]
async fn test_customer_amend() {
    let t = TestApp::new();
    t.post(
        "/orders",
        order_body("1234", &[("Adidas Classic", 1), ("Nike Air", 2)]),
    )
    .await;
    t.wait_for_status("1234", OrderStatus::CustomerActionRequired)
        .await;

    let response = t
        .post("/orders/1234/action", serde_json::json!({ "action": "amend" }))
        .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    t.wait_for_shipments("1234", 1).await;
    let order = json(t.get("/orders/1234").await).await;
    assert_eq!(order["status"], "processing");
    assert_eq!(order["fulfillments"][0]["status"], "cancelled");
}

#[tokio::test]
async fn test_invalid_customer_actions() {
    let t = TestApp::new();
    t.post(
        "/orders",
        order_body("1234", &[("Adidas Classic", 1), ("Nike Air", 2)]),
    )
    .await;
    t.wait_for_status("1234", OrderStatus::CustomerActionRequired)
        .await;

    for action in ["explode", "timedOut"] {
        let response = t
            .post("/orders/1234/action", serde_json::json!({ "action": action }))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{action}");
    }

    let response = t
        .post("/orders/missing/action", serde_json::json!({ "action": "cancel" }))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let order = json(t.get("/orders/1234").await).await;
    assert_eq!(order["status"], "customerActionRequired");
}

#[tokio::test]
async fn test_customer_action_while_processing_conflicts() {
    let t = TestApp::new();
    t.post("/orders", order_body("1234", &[("Hiking Boots", 1)]))
        .await;
    t.wait_for_shipments("1234", 1).await;

    let response = t
        .post("/orders/1234/action", serde_json::json!({ "action": "cancel" }))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_unknown_carrier_status() {
    let t = TestApp::new();
    t.post("/orders", order_body("1234", &[("Hiking Boots", 1)]))
        .await;
    t.wait_for_shipments("1234", 1).await;

    for status in ["lost", "pending"] {
        let response = t
            .post(
                "/shipments/1234:1/status",
                serde_json::json!({ "status": status }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{status}");
    }

    let shipment = json(t.get("/shipments/1234:1").await).await;
    assert_eq!(shipment["status"], "booked");
}

#[tokio::test]
async fn test_list_orders() {
    let t = TestApp::new();
    t.post("/orders", order_body("1001", &[("Adidas Classic", 1)]))
        .await;
    t.post("/orders", order_body("1002", &[("Adidas Classic", 1)]))
        .await;

    let response = t.get("/orders").await;
    assert_eq!(response.status(), StatusCode::OK);
    let orders = json(response).await;
    assert_eq!(orders.as_array().unwrap().len(), 2);

    let health = json(t.get("/health").await).await;
    assert_eq!(health["orders"], 2);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let t = TestApp::new();
    t.post("/orders", order_body("1234", &[("Hiking Boots", 1)]))
        .await;

    let response = t.get("/metrics").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "text/plain; version=0.0.4; charset=utf-8"
    );

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("orders_started_total"));
}
