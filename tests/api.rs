//! End-to-end checks of the REST surface against the in-memory store.

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use shopkeep::auth::TokenService;
use shopkeep::services::{EventPublisher, Services};
use shopkeep::store::{InMemoryStore, SharedStore};

struct TestApp {
    router: Router,
    services: Services,
}

impl TestApp {
    async fn spawn() -> Self {
        let store: SharedStore = Arc::new(InMemoryStore::new());
        let tokens = TokenService::new(b"integration-secret", chrono::Duration::hours(1));
        let services = Services::new(store, tokens, EventPublisher::disabled());
        shopkeep::seed::run(&services, Some("admin")).await.unwrap();
        Self { router: shopkeep::http::router(services.clone()), services }
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    async fn login(&self, username: &str, password: &str) -> String {
        let (status, body) = self
            .call(Method::POST, "/api/auth/login", None, Some(json!({"username": username, "password": password})))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    /// Register a user and, when `role` is a staff role, promote them as admin.
    async fn account(&self, username: &str, role: &str) -> String {
        let (status, _) = self
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({"username": username, "email": format!("{username}@example.com"), "password": "secret1"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        if role != "user" {
            let admin = self.login("admin", "admin").await;
            let id = self.services.accounts.get_by_username(username).await.unwrap().id;
            let (status, _) = self
                .call(Method::PUT, &format!("/api/users/{id}/role"), Some(&admin), Some(json!({"roleName": role})))
                .await;
            assert_eq!(status, StatusCode::OK);
        }
        self.login(username, "secret1").await
    }

    async fn stock_of(&self, product_id: &str, token: &str) -> (i64, i64) {
        let (_, product) = self.call(Method::GET, &format!("/api/products/{product_id}"), None, None).await;
        let (_, inventory) = self.call(Method::GET, &format!("/api/inventory/{product_id}"), Some(token), None).await;
        (product["stock"].as_i64().unwrap(), inventory["quantity"].as_i64().unwrap())
    }
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::spawn().await;
    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn order_requires_token() {
    let app = TestApp::spawn().await;
    let (status, body) = app.call(Method::GET, "/api/orders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["msg"], "Unauthorized: No token");

    let (status, _) = app.call(Method::GET, "/api/orders", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn fulfilment_and_return_flow() {
    let app = TestApp::spawn().await;
    let admin = app.login("admin", "admin").await;
    let manager = app.account("wendy", "warehouse_manager").await;
    let agent = app.account("dave", "delivery_agent").await;
    let user = app.account("uma", "user").await;

    let (status, product) = app
        .call(Method::POST, "/api/products", Some(&admin), Some(json!({"name": "Lamp", "price": 25, "stock": 10})))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{product}");
    let pid = product["id"].as_str().unwrap().to_string();
    assert_eq!(app.stock_of(&pid, &admin).await, (10, 10));

    let (status, _) = app
        .call(Method::POST, "/api/products", Some(&user), Some(json!({"name": "Nope", "price": 1})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, order) = app
        .call(Method::POST, "/api/orders", Some(&user), Some(json!({"products": [{"product": pid, "quantity": 4}], "totalAmount": 100})))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert_eq!(order["status"], "pending");
    assert_eq!(order["returnRequest"], false);
    let oid = order["id"].as_str().unwrap().to_string();
    assert_eq!(app.stock_of(&pid, &admin).await, (6, 6));

    let (status, _) = app
        .call(Method::POST, "/api/orders", Some(&admin), Some(json!({"products": [{"product": pid, "quantity": 1}], "totalAmount": 25})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(Method::PUT, &format!("/api/orders/{oid}/status"), Some(&manager), Some(json!({"status": "processed"})))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, _) = app.call(Method::PUT, &format!("/api/orders/{oid}/cancel"), Some(&agent), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.call(Method::PUT, &format!("/api/orders/{oid}/cancel"), Some(&manager), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(Method::PUT, &format!("/api/orders/{oid}/status"), Some(&agent), Some(json!({"status": "delivered"})))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, _) = app
        .call(Method::PUT, &format!("/api/orders/{oid}/status"), Some(&admin), Some(json!({"status": "returned"})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.call(Method::PUT, &format!("/api/orders/{oid}/return"), Some(&user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["returnRequest"], true);

    let (status, body) = app
        .call(Method::PUT, &format!("/api/orders/{oid}/status"), Some(&admin), Some(json!({"status": "returned"})))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(app.stock_of(&pid, &admin).await, (10, 10));

    let (status, _) = app
        .call(Method::PUT, &format!("/api/orders/{oid}/status"), Some(&admin), Some(json!({"status": "returned"})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(app.stock_of(&pid, &admin).await, (10, 10));
}

#[tokio::test]
async fn rejected_orders_leave_stock_untouched() {
    let app = TestApp::spawn().await;
    let admin = app.login("admin", "admin").await;
    let user = app.account("uma", "user").await;
    let (_, product) = app
        .call(Method::POST, "/api/products", Some(&admin), Some(json!({"name": "Chair", "price": 40, "stock": 3})))
        .await;
    let pid = product["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(Method::POST, "/api/orders", Some(&user), Some(json!({"products": [{"product": pid, "quantity": 5}], "totalAmount": 200})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["msg"].as_str().unwrap().contains("Insufficient stock"));

    let (status, _) = app
        .call(Method::POST, "/api/orders", Some(&user), Some(json!({"products": [{"product": pid, "quantity": 0}], "totalAmount": 1})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(Method::POST, "/api/orders", Some(&user), Some(json!({"products": [], "totalAmount": 1})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, orders) = app.call(Method::GET, "/api/orders", Some(&user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(orders.as_array().unwrap().len(), 0);
    assert_eq!(app.stock_of(&pid, &admin).await, (3, 3));
}

#[tokio::test]
async fn inventory_surface_is_staff_only() {
    let app = TestApp::spawn().await;
    let admin = app.login("admin", "admin").await;
    let user = app.account("uma", "user").await;
    let (_, product) = app
        .call(Method::POST, "/api/products", Some(&admin), Some(json!({"name": "Desk", "price": 120, "stock": 2})))
        .await;
    let pid = product["id"].as_str().unwrap().to_string();

    let (status, _) = app.call(Method::GET, "/api/inventory", Some(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(Method::PUT, "/api/inventory", Some(&admin), Some(json!({"productId": pid, "quantity": 8})))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(app.stock_of(&pid, &admin).await, (8, 8));

    let (status, _) = app
        .call(Method::PUT, "/api/inventory", Some(&admin), Some(json!({"productId": pid, "quantity": -1})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, list) = app.call(Method::GET, "/api/inventory", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list[0]["productDetails"]["name"], "Desk");

    let (status, _) = app
        .call(Method::GET, &format!("/api/inventory/{}", uuid::Uuid::now_v7()), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn order_visibility_by_role() {
    let app = TestApp::spawn().await;
    let admin = app.login("admin", "admin").await;
    let alice = app.account("alice", "user").await;
    let bob = app.account("bob", "user").await;
    let (_, product) = app
        .call(Method::POST, "/api/products", Some(&admin), Some(json!({"name": "Book", "price": 9, "stock": 20})))
        .await;
    let pid = product["id"].as_str().unwrap().to_string();
    let (_, order) = app
        .call(Method::POST, "/api/orders", Some(&alice), Some(json!({"products": [{"product": pid, "quantity": 1}], "totalAmount": 9})))
        .await;
    let oid = order["id"].as_str().unwrap().to_string();

    let (status, read) = app.call(Method::GET, &format!("/api/orders/{oid}"), Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read["products"][0]["productDetails"]["name"], "Book");
    assert_eq!(read["userDetails"]["username"], "alice");
    let (status, _) = app.call(Method::GET, &format!("/api/orders/{oid}"), Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, bobs) = app.call(Method::GET, "/api/orders", Some(&bob), None).await;
    assert!(bobs.as_array().unwrap().is_empty());
    let (_, all) = app.call(Method::GET, "/api/orders", Some(&admin), None).await;
    assert_eq!(all.as_array().unwrap().len(), 1);
    assert_eq!(all[0]["userDetails"]["username"], "alice");
}

#[tokio::test]
async fn account_rules() {
    let app = TestApp::spawn().await;
    let admin = app.login("admin", "admin").await;
    let user = app.account("uma", "user").await;

    let (status, _) = app
        .call(Method::POST, "/api/auth/register", None, Some(json!({"username": "uma", "email": "x@example.com", "password": "secret1"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app
        .call(Method::POST, "/api/auth/login", None, Some(json!({"username": "uma", "password": "wrong"})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.call(Method::GET, "/api/users", Some(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, users) = app.call(Method::GET, "/api/users", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 2);
    assert!(users[0].get("passwordHash").is_none());

    let (status, me) = app.call(Method::GET, "/api/users/username/uma", Some(&user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["role"], "user");

    let id = me["id"].as_str().unwrap().to_string();
    let (status, _) = app.call(Method::DELETE, &format!("/api/users/{id}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app.call(Method::GET, "/api/orders", Some(&user), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["msg"], "Unauthorized: Invalid user");
}
