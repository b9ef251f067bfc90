//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use api::Config;
use api::demo::InMemoryCollaborators;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use domain::{
    AccountId, CouponDefinition, CouponDiscount, Money, Principal, Product, ProductId, Role,
};
use event_store::{InMemoryEventStore, InMemorySequenceAllocator};
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

const ALICE: &str = "aaaaaaaaaaaaaaaaaaaaaaaa";
const BOB: &str = "bbbbbbbbbbbbbbbbbbbbbbbb";
const ALICE_TOKEN: &str = "alice-token";
const BOB_TOKEN: &str = "bob-token";
const ADMIN_TOKEN: &str = "admin-token";

struct TestApp {
    app: Router,
    collaborators: InMemoryCollaborators,
}

impl TestApp {
    async fn new() -> Self {
        let config = Config {
            admin_token: Some(ADMIN_TOKEN.to_string()),
            ..Config::default()
        };
        let (state, collaborators) = api::create_default_state(
            InMemoryEventStore::new(),
            Arc::new(InMemorySequenceAllocator::new()),
            &config,
        );
        collaborators.seed(&config).await.unwrap();

        for (token, account) in [(ALICE_TOKEN, ALICE), (BOB_TOKEN, BOB)] {
            collaborators
                .accounts
                .register(
                    token,
                    Principal {
                        account_id: AccountId::parse(account).unwrap(),
                        role: Role::Customer,
                    },
                )
                .await;
        }
        collaborators
            .catalog
            .upsert(Product::new(
                "widget",
                "Widget",
                "WID-001",
                Money::from_cents(1000),
                10,
            ))
            .await;
        collaborators
            .catalog
            .upsert(Product::new(
                "gizmo",
                "Gizmo",
                "GIZ-001",
                Money::from_cents(2500),
                5,
            ))
            .await;
        collaborators
            .coupons
            .insert(CouponDefinition::new(
                "SAVE10",
                CouponDiscount::Percentage(10),
            ))
            .await;

        let app = api::create_app(state, get_metrics_handle(), &config);
        Self { app, collaborators }
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn stock_of(&self, product: &str) -> u32 {
        self.collaborators
            .catalog
            .stock_of(&ProductId::new(product))
            .await
            .unwrap()
    }

    /// Fills Alice's cart with 2 widgets, 1 gizmo and the SAVE10 coupon.
    async fn fill_alice_cart(&self) {
        let cart = format!("/cart/{ALICE}");
        for (product, quantity) in [("widget", 2), ("gizmo", 1)] {
            let (status, _) = self
                .send(
                    "POST",
                    &format!("{cart}/add"),
                    Some(ALICE_TOKEN),
                    Some(json!({ "product_id": product, "quantity": quantity })),
                )
                .await;
            assert_eq!(status, StatusCode::OK);
        }
        let (status, _) = self
            .send(
                "POST",
                &format!("{cart}/apply-coupon"),
                Some(ALICE_TOKEN),
                Some(json!({ "code": "save10" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    /// Checks out Alice's cart and returns the order id.
    async fn place_alice_order(&self) -> String {
        self.fill_alice_cart().await;
        let (status, body) = self
            .send("POST", "/orders", Some(ALICE_TOKEN), Some(checkout_body()))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["order"]["id"].as_str().unwrap().to_string()
    }
}

fn address() -> Value {
    json!({
        "full_name": "Alice Example",
        "line1": "1 Main St",
        "city": "Springfield",
        "postal_code": "12345",
        "country": "US"
    })
}

fn checkout_body() -> Value {
    json!({ "payment_method": "card", "billing_address": address() })
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new().await;
    let (status, body) = app.send("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["orders_indexed"], 0);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = TestApp::new().await;
    let response = app
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));
}

mod carts {
    use super::*;

    #[tokio::test]
    async fn anonymous_cart_is_created_on_first_read() {
        let app = TestApp::new().await;
        let (status, body) = app.send("GET", "/cart/temp_k9x2", None, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["key"], "temp_k9x2");
        assert_eq!(body["items"], json!([]));
        assert_eq!(body["totals"]["total"], 0);
    }

    #[tokio::test]
    async fn repeat_add_increases_quantity() {
        let app = TestApp::new().await;
        for _ in 0..2 {
            let (status, _) = app
                .send(
                    "POST",
                    "/cart/temp_k9x2/add",
                    None,
                    Some(json!({ "product_id": "widget", "quantity": 2 })),
                )
                .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (_, body) = app.send("GET", "/cart/temp_k9x2", None, None).await;
        assert_eq!(body["items"].as_array().unwrap().len(), 1);
        assert_eq!(body["items"][0]["quantity"], 4);
        assert_eq!(body["totals"]["subtotal"], 4000);
    }

    #[tokio::test]
    async fn update_and_remove_lines() {
        let app = TestApp::new().await;
        let (_, body) = app
            .send(
                "POST",
                "/cart/temp_k9x2/add",
                None,
                Some(json!({ "product_id": "gizmo" })),
            )
            .await;
        let item_id = body["items"][0]["item_id"].as_str().unwrap().to_string();

        let (status, body) = app
            .send(
                "PUT",
                &format!("/cart/temp_k9x2/update/{item_id}"),
                None,
                Some(json!({ "quantity": 3 })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_quantity"], 3);

        let (status, body) = app
            .send(
                "PUT",
                &format!("/cart/temp_k9x2/update/{item_id}"),
                None,
                Some(json!({ "quantity": 6 })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

        let (status, _) = app
            .send("DELETE", "/cart/temp_k9x2/remove/unknown-item", None, None)
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = app
            .send(
                "DELETE",
                &format!("/cart/temp_k9x2/remove/{item_id}"),
                None,
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"], json!([]));
    }

    #[tokio::test]
    async fn keys_are_validated() {
        let app = TestApp::new().await;

        let (status, body) = app.send("GET", "/cart/guest-1", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "key");

        let (status, _) = app
            .send("GET", "/cart/cccccccccccccccccccccccc", Some(ADMIN_TOKEN), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn account_carts_need_the_owners_session() {
        let app = TestApp::new().await;
        let cart = format!("/cart/{ALICE}");
        let add = json!({ "product_id": "widget", "quantity": 1 });

        let (status, _) = app.send("GET", &cart, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = app
            .send("POST", &format!("{cart}/add"), Some(BOB_TOKEN), Some(add.clone()))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = app
            .send("GET", &cart, Some("not-a-session"), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = app
            .send("POST", &format!("{cart}/add"), Some(ALICE_TOKEN), Some(add))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_quantity"], 1);

        let (status, body) = app.send("GET", &cart, Some(ADMIN_TOKEN), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_quantity"], 1);
    }

    #[tokio::test]
    async fn bad_input_names_the_field() {
        let app = TestApp::new().await;
        app.send("GET", "/cart/temp_k9x2", None, None).await;

        let (status, body) = app
            .send(
                "POST",
                "/cart/temp_k9x2/add",
                None,
                Some(json!({ "product_id": "widget", "quantity": 0 })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "quantity");

        let (status, body) = app
            .send(
                "POST",
                "/cart/temp_k9x2/apply-coupon",
                None,
                Some(json!({ "code": "NOPE" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "code");

        let (status, body) = app
            .send(
                "PUT",
                "/cart/temp_k9x2/shipping-method",
                None,
                Some(json!({ "method": "teleport" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "method");

        let mut blank = address();
        blank["postal_code"] = json!(" ");
        let (status, body) = app
            .send("PUT", "/cart/temp_k9x2/shipping-address", None, Some(blank))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "postal_code");

        let (status, _) = app
            .send(
                "POST",
                "/cart/temp_k9x2/add",
                None,
                Some(json!({ "product_id": "unobtainium" })),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn shipping_method_adds_its_cost() {
        let app = TestApp::new().await;
        app.send(
            "POST",
            "/cart/temp_k9x2/add",
            None,
            Some(json!({ "product_id": "widget" })),
        )
        .await;

        let (status, body) = app
            .send(
                "PUT",
                "/cart/temp_k9x2/shipping-method",
                None,
                Some(json!({ "method": "express" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["shipping"]["method"], "express");
        assert_eq!(body["totals"]["shipping_cost"], 1299);
    }

    #[tokio::test]
    async fn stale_expected_version_is_a_conflict() {
        let app = TestApp::new().await;
        let (_, body) = app.send("GET", "/cart/temp_k9x2", None, None).await;
        let version = body["version"].as_i64().unwrap();

        let (status, _) = app
            .send(
                "POST",
                "/cart/temp_k9x2/add",
                None,
                Some(json!({ "product_id": "widget", "expected_version": version })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = app
            .send(
                "POST",
                "/cart/temp_k9x2/add",
                None,
                Some(json!({ "product_id": "gizmo", "expected_version": version })),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = app
            .send(
                "DELETE",
                &format!("/cart/temp_k9x2/clear?expected_version={version}"),
                None,
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn deleting_from_a_missing_cart_is_not_found() {
        let app = TestApp::new().await;
        let (status, _) = app.send("DELETE", "/cart/temp_new1/clear", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

mod checkout {
    use super::*;

    #[tokio::test]
    async fn worked_example() {
        let app = TestApp::new().await;
        app.fill_alice_cart().await;

        let (status, body) = app
            .send("POST", "/orders", Some(ALICE_TOKEN), Some(checkout_body()))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["checkout_state"], "completed");

        let order = &body["order"];
        assert_eq!(order["status"], "pending");
        assert_eq!(order["customer"], ALICE);
        assert_eq!(order["totals"]["subtotal"], 4500);
        assert_eq!(order["totals"]["discount"], 450);
        assert_eq!(order["totals"]["tax"], 324);
        assert_eq!(order["totals"]["shipping_cost"], 599);
        assert_eq!(order["totals"]["total"], 4973);
        assert_eq!(order["shipping_address"]["city"], "Springfield");
        assert!(order["stock_committed"].as_bool().unwrap());

        assert_eq!(app.stock_of("widget").await, 8);
        assert_eq!(app.stock_of("gizmo").await, 4);

        let (_, cart) = app
            .send("GET", &format!("/cart/{ALICE}"), Some(ALICE_TOKEN), None)
            .await;
        assert_eq!(cart["items"], json!([]));
    }

    #[tokio::test]
    async fn requires_a_session() {
        let app = TestApp::new().await;
        let (status, _) = app
            .send("POST", "/orders", None, Some(checkout_body()))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app
            .send("POST", "/orders", Some("forged"), Some(checkout_body()))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn token_cookie_is_accepted() {
        let app = TestApp::new().await;
        let request = Request::builder()
            .uri("/orders")
            .header("cookie", format!("token={ALICE_TOKEN}"))
            .body(Body::empty())
            .unwrap();
        let response = app.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn empty_cart_is_rejected() {
        let app = TestApp::new().await;
        let (status, body) = app
            .send("POST", "/orders", Some(BOB_TOKEN), Some(checkout_body()))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Cart is empty");
    }

    #[tokio::test]
    async fn over_stock_is_rejected_and_nothing_changes() {
        let app = TestApp::new().await;
        app.fill_alice_cart().await;
        app.collaborators
            .catalog
            .upsert(Product::new(
                "widget",
                "Widget",
                "WID-001",
                Money::from_cents(1000),
                1,
            ))
            .await;

        let (status, _) = app
            .send("POST", "/orders", Some(ALICE_TOKEN), Some(checkout_body()))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(app.stock_of("widget").await, 1);
        assert_eq!(app.stock_of("gizmo").await, 5);

        let (_, cart) = app
            .send("GET", &format!("/cart/{ALICE}"), Some(ALICE_TOKEN), None)
            .await;
        assert_eq!(cart["total_quantity"], 3);
    }

    #[tokio::test]
    async fn blank_billing_field_is_a_validation_error() {
        let app = TestApp::new().await;
        app.fill_alice_cart().await;

        let mut body = checkout_body();
        body["billing_address"]["city"] = json!("");
        let (status, body) = app.send("POST", "/orders", Some(ALICE_TOKEN), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "city");
    }

    #[tokio::test]
    async fn unknown_payment_method_is_rejected() {
        let app = TestApp::new().await;
        let mut body = checkout_body();
        body["payment_method"] = json!("barter");
        let (status, _) = app.send("POST", "/orders", Some(ALICE_TOKEN), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

mod orders {
    use super::*;

    #[tokio::test]
    async fn customers_see_only_their_own_orders() {
        let app = TestApp::new().await;
        let order_id = app.place_alice_order().await;

        let (status, list) = app.send("GET", "/orders", Some(ALICE_TOKEN), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["order_id"], order_id);
        assert_eq!(list[0]["total"], 4973);

        let (_, list) = app.send("GET", "/orders", Some(BOB_TOKEN), None).await;
        assert_eq!(list, json!([]));

        let uri = format!("/orders/{order_id}");
        let (status, order) = app.send("GET", &uri, Some(ALICE_TOKEN), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(order["id"], order_id);

        let (status, _) = app.send("GET", &uri, Some(BOB_TOKEN), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app
            .send("GET", "/orders/no-such-order", Some(ALICE_TOKEN), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn customer_cancel_restores_stock() {
        let app = TestApp::new().await;
        let order_id = app.place_alice_order().await;
        let uri = format!("/orders/{order_id}/cancel");

        let (status, _) = app
            .send("PUT", &uri, Some(BOB_TOKEN), Some(json!({})))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, order) = app
            .send(
                "PUT",
                &uri,
                Some(ALICE_TOKEN),
                Some(json!({ "reason": "changed my mind" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{order}");
        assert_eq!(order["status"], "cancelled");
        assert_eq!(order["cancellation_reason"], "changed my mind");
        assert_eq!(app.stock_of("widget").await, 10);
        assert_eq!(app.stock_of("gizmo").await, 5);

        let (status, _) = app
            .send("PUT", &uri, Some(ALICE_TOKEN), Some(json!({})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(app.stock_of("widget").await, 10);
    }
}

mod admin {
    use super::*;

    #[tokio::test]
    async fn admin_routes_require_the_admin_role() {
        let app = TestApp::new().await;

        let (status, _) = app.send("GET", "/orders/admin", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app
            .send("GET", "/orders/admin", Some(ALICE_TOKEN), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app
            .send("GET", "/orders/admin", Some(ADMIN_TOKEN), None)
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let app = TestApp::new().await;
        let order_id = app.place_alice_order().await;

        let (_, all) = app
            .send("GET", "/orders/admin", Some(ADMIN_TOKEN), None)
            .await;
        assert_eq!(all.as_array().unwrap().len(), 1);

        let (_, shipped) = app
            .send("GET", "/orders/admin?status=shipped", Some(ADMIN_TOKEN), None)
            .await;
        assert_eq!(shipped, json!([]));

        let (_, pending) = app
            .send("GET", "/orders/admin?status=pending", Some(ADMIN_TOKEN), None)
            .await;
        assert_eq!(pending[0]["order_id"], order_id);

        let (status, body) = app
            .send("GET", "/orders/admin?status=lost", Some(ADMIN_TOKEN), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "status");
    }

    #[tokio::test]
    async fn status_transitions() {
        let app = TestApp::new().await;
        let order_id = app.place_alice_order().await;
        let uri = format!("/orders/admin/{order_id}/status");

        let (status, order) = app
            .send(
                "PUT",
                &uri,
                Some(ADMIN_TOKEN),
                Some(json!({ "status": "confirmed" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{order}");
        assert_eq!(order["status"], "confirmed");
        assert_eq!(order["payment_status"], "paid");

        let (status, _) = app
            .send(
                "PUT",
                &uri,
                Some(ADMIN_TOKEN),
                Some(json!({ "status": "pending" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, order) = app
            .send(
                "PUT",
                &uri,
                Some(ADMIN_TOKEN),
                Some(json!({ "status": "cancelled", "message": "fraud check" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(order["status"], "cancelled");
        assert_eq!(app.stock_of("widget").await, 10);
        assert_eq!(app.stock_of("gizmo").await, 5);
    }

    #[tokio::test]
    async fn refunds_are_capped_at_the_total() {
        let app = TestApp::new().await;
        let order_id = app.place_alice_order().await;
        let uri = format!("/orders/admin/{order_id}/refund");

        let (status, body) = app
            .send(
                "POST",
                &uri,
                Some(ADMIN_TOKEN),
                Some(json!({ "amount": 5000, "reason": "too much" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "amount");

        let (_, order) = app
            .send("GET", &format!("/orders/{order_id}"), Some(ALICE_TOKEN), None)
            .await;
        assert_eq!(order["status"], "pending");
        assert_eq!(order["total_refunded"], 0);

        let (status, order) = app
            .send(
                "POST",
                &uri,
                Some(ADMIN_TOKEN),
                Some(json!({ "amount": 1000, "reason": "damaged", "method": "store_credit" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{order}");
        assert_eq!(order["total_refunded"], 1000);
        assert_eq!(order["refunds"][0]["method"], "store_credit");
    }

    #[tokio::test]
    async fn checkout_log_and_resume() {
        let app = TestApp::new().await;
        let order_id = app.place_alice_order().await;

        let (status, log) = app
            .send(
                "GET",
                &format!("/orders/admin/{order_id}/checkout"),
                Some(ADMIN_TOKEN),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(log["state"], "completed");

        let (status, _) = app
            .send(
                "POST",
                &format!("/orders/admin/{order_id}/checkout/resume"),
                Some(ADMIN_TOKEN),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = app
            .send(
                "GET",
                "/orders/admin/no-such-order/checkout",
                Some(ADMIN_TOKEN),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app
            .send(
                "POST",
                "/orders/admin/no-such-order/checkout/resume",
                Some(ADMIN_TOKEN),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, report) = app
            .send(
                "POST",
                "/orders/admin/checkout/resume-stalled",
                Some(ADMIN_TOKEN),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["resumed"], json!([]));
    }
}
