use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use minimart_api::app::AppServices;
use minimart_auth::{JwtClaims, Role};
use minimart_core::{ProductId, UserId};
use minimart_products::Product;
use reqwest::StatusCode;
use serde_json::{Value, json};

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    services: Arc<AppServices>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Build the production router over in-memory stores seeded with `products`,
    /// bound to an ephemeral port.
    async fn spawn(products: Vec<Product>) -> Self {
        let services = Arc::new(AppServices::in_memory(Duration::from_secs(5)));
        let store = services.in_memory_store().expect("in-memory services");
        for p in products {
            store.upsert_product(p).expect("seed product");
        }

        let app = minimart_api::app::build_app(JWT_SECRET.to_string(), services.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            services,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(user_id: i64, role: Role) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: UserId::from_raw(user_id),
        username: format!("user{user_id}"),
        role,
        issued_at: now - ChronoDuration::seconds(1),
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn product(id: i64, name: &str, threshold: i64) -> Product {
    Product::new(ProductId::from_raw(id), name, format!("SKU-{id}")).with_low_stock_threshold(threshold)
}

async fn adjust(
    client: &reqwest::Client,
    srv: &TestServer,
    token: &str,
    body: Value,
) -> (StatusCode, Value) {
    let res = client
        .post(srv.url("/inventory/adjust"))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

async fn get_json(client: &reqwest::Client, srv: &TestServer, token: &str, path: &str) -> Value {
    let res = client
        .get(srv.url(path))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK, "GET {path}");
    res.json().await.unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn(vec![]).await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn auth_required_for_inventory_endpoints() {
    let srv = TestServer::spawn(vec![]).await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/inventory")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(srv.url("/inventory"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn cashier_is_forbidden_and_audited() {
    let srv = TestServer::spawn(vec![product(1, "Rice", 0)]).await;
    let client = reqwest::Client::new();
    let token = mint_jwt(5, Role::cashier());

    let res = client
        .get(srv.url("/inventory"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let (status, _) = adjust(
        &client,
        &srv,
        &token,
        json!({"product_id": 1, "direction": "IN", "quantity": 1}),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let audit = srv.services.in_memory_audit().unwrap();
    let denied = audit.entries_for("FORBIDDEN_ACCESS");
    assert_eq!(denied.len(), 2);
    assert_eq!(denied[0].user_id, Some(UserId::from_raw(5)));
    assert_eq!(
        denied[0].details,
        json!("Attempt to access /inventory with role Cashier")
    );
    assert_eq!(
        denied[1].details,
        json!("Attempt to access /inventory/adjust with role Cashier")
    );
    assert!(audit.entries_for("inventory.adjust").is_empty());
}

#[tokio::test]
async fn adjust_then_query_stock() {
    let srv = TestServer::spawn(vec![product(1, "Rice", 5), product(2, "Beans", 0)]).await;
    let client = reqwest::Client::new();
    let token = mint_jwt(7, Role::manager());

    let (status, body) = adjust(
        &client,
        &srv,
        &token,
        json!({"product_id": 1, "direction": "IN", "quantity": 20, "reason": "delivery"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["before"], 0);
    assert_eq!(body["after"], 20);
    assert_eq!(body["movement"]["direction"], "IN");
    assert_eq!(body["movement"]["movement_type"], "ADJUST");
    assert_eq!(body["movement"]["reference_type"], "MANUAL");
    assert_eq!(body["movement"]["created_by"], 7);

    let (status, body) = adjust(
        &client,
        &srv,
        &token,
        json!({"product_id": 1, "direction": "OUT", "quantity": 16}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!((body["before"].clone(), body["after"].clone()), (json!(20), json!(4)));

    let inventory = get_json(&client, &srv, &token, "/inventory").await;
    let rows = inventory.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    // Ordered by name: Beans, Rice.
    assert_eq!(rows[0]["name"], "Beans");
    assert_eq!(rows[0]["current_stock"], 0);
    assert_eq!(rows[1]["name"], "Rice");
    assert_eq!(rows[1]["current_stock"], 4);

    let audit = srv.services.in_memory_audit().unwrap();
    let entries = audit.entries_for("inventory.adjust");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].details["before"], 20);
    assert_eq!(entries[1].details["after"], 4);
}

#[tokio::test]
async fn negative_stock_is_a_conflict() {
    let srv = TestServer::spawn(vec![product(1, "Rice", 0)]).await;
    let client = reqwest::Client::new();
    let token = mint_jwt(1, Role::admin());

    let (status, body) = adjust(
        &client,
        &srv,
        &token,
        json!({"product_id": 1, "direction": "OUT", "quantity": 1}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "insufficient_stock");
    assert_eq!(body["requested"], 1);
    assert_eq!(body["available"], 0);

    let movements = get_json(&client, &srv, &token, "/inventory/movements").await;
    assert!(movements.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_adjustments_are_rejected() {
    let srv = TestServer::spawn(vec![product(1, "Rice", 0)]).await;
    let client = reqwest::Client::new();
    let token = mint_jwt(1, Role::manager());

    let cases = [
        (json!({"direction": "IN", "quantity": 1}), "product_id must be an integer"),
        (json!({"product_id": "1", "direction": "IN", "quantity": 1}), "product_id must be an integer"),
        (json!({"product_id": 1, "direction": "in", "quantity": 1}), "direction must be IN or OUT"),
        (json!({"product_id": 1, "direction": "IN", "quantity": 0}), "quantity must be a positive integer"),
        (json!({"product_id": 1, "direction": "IN", "quantity": 2.5}), "quantity must be a positive integer"),
    ];

    for (body, message) in cases {
        let (status, res) = adjust(&client, &srv, &token, body.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(res["error"], "validation_error");
        assert_eq!(res["message"], message, "{body}");
    }

    let (status, res) = adjust(
        &client,
        &srv,
        &token,
        json!({"product_id": 1, "direction": "IN", "quantity": 1, "movement_type": "SALE"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(res["error"], "validation_error");

    let res = client
        .post(srv.url("/inventory/adjust"))
        .bearer_auth(&token)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let movements = get_json(&client, &srv, &token, "/inventory/movements").await;
    assert!(movements.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn stock_overflow_is_a_validation_error() {
    let srv = TestServer::spawn(vec![product(1, "Rice", 0)]).await;
    let client = reqwest::Client::new();
    let token = mint_jwt(1, Role::manager());

    let (status, _) = adjust(
        &client,
        &srv,
        &token,
        json!({"product_id": 1, "direction": "IN", "quantity": 1}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, res) = adjust(
        &client,
        &srv,
        &token,
        json!({"product_id": 1, "direction": "IN", "quantity": i64::MAX}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(res["message"], "quantity would overflow the stock level");

    let inventory = get_json(&client, &srv, &token, "/inventory").await;
    assert_eq!(inventory[0]["current_stock"], 1);
}

#[tokio::test]
async fn unknown_product_is_not_found() {
    let srv = TestServer::spawn(vec![product(1, "Rice", 0)]).await;
    let client = reqwest::Client::new();
    let token = mint_jwt(1, Role::manager());

    let (status, body) = adjust(
        &client,
        &srv,
        &token,
        json!({"product_id": 42, "direction": "IN", "quantity": 1}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn low_stock_tracks_adjustments() {
    let srv = TestServer::spawn(vec![product(1, "Rice", 5), product(2, "Beans", 0)]).await;
    let client = reqwest::Client::new();
    let token = mint_jwt(1, Role::manager());

    // No movements yet: Beans (0 <= 0) and Rice (0 <= 5) are both low.
    let low = get_json(&client, &srv, &token, "/inventory/low-stock").await;
    assert_eq!(low.as_array().unwrap().len(), 2);

    for body in [
        json!({"product_id": 1, "direction": "IN", "quantity": 20}),
        json!({"product_id": 1, "direction": "OUT", "quantity": 16}),
        json!({"product_id": 2, "direction": "IN", "quantity": 1}),
    ] {
        let (status, _) = adjust(&client, &srv, &token, body).await;
        assert_eq!(status, StatusCode::OK);
    }

    let low = get_json(&client, &srv, &token, "/inventory/low-stock").await;
    let low = low.as_array().unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0]["id"], 1);
    assert_eq!(low[0]["current_stock"], 4);

    let (_, body) = adjust(
        &client,
        &srv,
        &token,
        json!({"product_id": 1, "direction": "IN", "quantity": 10}),
    )
    .await;
    assert_eq!((body["before"].clone(), body["after"].clone()), (json!(4), json!(14)));

    let low = get_json(&client, &srv, &token, "/inventory/low-stock").await;
    assert!(low.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn movements_are_newest_first_with_product_summary() {
    let srv = TestServer::spawn(vec![product(1, "Rice", 3)]).await;
    let client = reqwest::Client::new();
    let token = mint_jwt(1, Role::manager());

    let mut ids = Vec::new();
    for qty in [3, 1, 2] {
        let (_, body) = adjust(
            &client,
            &srv,
            &token,
            json!({"product_id": 1, "direction": "IN", "quantity": qty}),
        )
        .await;
        ids.push(body["movement"]["id"].as_i64().unwrap());
    }

    let movements = get_json(&client, &srv, &token, "/inventory/movements").await;
    let listed: Vec<i64> = movements
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_i64().unwrap())
        .collect();
    ids.reverse();
    assert_eq!(listed, ids);

    let first = &movements[0];
    assert_eq!(first["quantity"], 2);
    assert_eq!(first["product"]["name"], "Rice");
    assert_eq!(first["product"]["sku"], "SKU-1");
    assert_eq!(first["product"]["low_stock_threshold"], 3);
    assert_eq!(first["product"]["is_active"], true);

    let page = get_json(&client, &srv, &token, "/inventory/movements?limit=1&offset=1").await;
    let page = page.as_array().unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0]["id"].as_i64().unwrap(), ids[1]);

    let res = client
        .get(srv.url("/inventory/movements?limit=many"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
