//! HTTP-level tests: the Axum router driven with `oneshot` requests.

mod common;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use market_core::common::{AccountId, Role};
use market_core::domains::auth::JwtService;
use market_core::kernel::TestDependencies;
use market_core::server::build_app;
use market_core::Market;
use serde_json::{json, Value};
use tower::ServiceExt;

const WEBHOOK_SECRET: &str = "test-webhook-secret";

struct TestApp {
    router: Router,
    jwt: Arc<JwtService>,
}

impl TestApp {
    fn new() -> Self {
        let market = Market::new(TestDependencies::new().into_server_deps());
        let jwt = Arc::new(JwtService::new("test_secret", "test_issuer".to_string()));
        let router = build_app(market, jwt.clone(), WEBHOOK_SECRET.to_string());
        Self { router, jwt }
    }

    fn token(&self, account_id: AccountId, role: Role) -> String {
        self.jwt.create_token(account_id, role).unwrap()
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    async fn callback(&self, secret: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/payments/callback")
            .header("content-type", "application/json")
            .header("x-webhook-secret", secret)
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }
}

fn listing_body(name: &str, price: i64, answer: &str) -> Value {
    json!({
        "name": name,
        "description": "Short, memorable, aged",
        "asking_price": price,
        "captcha": {
            "challenge_id": uuid::Uuid::new_v4(),
            "answer": answer,
        },
    })
}

#[tokio::test]
async fn health_reports_store_status() {
    let app = TestApp::new();
    let (status, body) = app.get("/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"]["status"], "ok");
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            "/listings",
            None,
            listing_body("anon.com", 100, TestDependencies::CAPTCHA_ANSWER),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");

    let (status, _) = app.get("/wallet", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn failed_captcha_rejects_submission() {
    let app = TestApp::new();
    let seller = app.token(AccountId::new(), Role::Seller);

    let (status, body) = app
        .post("/listings", Some(&seller), listing_body("bot.com", 100, "wrong"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn non_admins_only_browse_approved_listings() {
    let app = TestApp::new();
    let seller = app.token(AccountId::new(), Role::Seller);
    let admin = app.token(AccountId::new(), Role::Admin);
    app.post("/wallet", Some(&seller), json!({})).await;

    let (status, _) = app
        .post(
            "/listings",
            Some(&seller),
            listing_body("queued.com", 100, TestDependencies::CAPTCHA_ANSWER),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.get("/listings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 0);

    let (status, _) = app
        .get("/listings?status=pending_review", Some(&seller))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .get("/listings?status=pending_review", Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["metadata"]["name"], "queued.com");
}

#[tokio::test]
async fn listing_without_a_wallet_is_not_found() {
    let app = TestApp::new();
    let seller = app.token(AccountId::new(), Role::Seller);

    let (status, body) = app
        .post(
            "/listings",
            Some(&seller),
            listing_body("walletless.com", 100, TestDependencies::CAPTCHA_ANSWER),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn bad_webhook_secret_is_unauthenticated() {
    let app = TestApp::new();

    let (status, _) = app
        .callback(
            "guess",
            json!({
                "external_tx_id": "tx-1",
                "account_id": AccountId::new(),
                "amount": 100,
                "intent_id": null,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn full_purchase_over_http() {
    let app = TestApp::new();
    let seller_id = AccountId::new();
    let buyer_id = AccountId::new();
    let seller = app.token(seller_id, Role::Seller);
    let buyer = app.token(buyer_id, Role::Buyer);
    let admin = app.token(AccountId::new(), Role::Admin);

    // Wallets
    let (status, body) = app.post("/wallet", Some(&seller), json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["balance"], 0);
    let (status, _) = app.post("/wallet", Some(&buyer), json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app.post("/wallet", Some(&buyer), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Fund the buyer through the provider webhook; the replay is a no-op
    let top_up = json!({
        "external_tx_id": "tx-fund-1",
        "account_id": buyer_id,
        "amount": 1_000,
        "intent_id": null,
    });
    let (status, first) = app.callback(WEBHOOK_SECRET, top_up.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["outcome"]["type"], "top_up");
    let (_, replay) = app.callback(WEBHOOK_SECRET, top_up).await;
    assert_eq!(first, replay);

    // List and approve
    let (status, listing) = app
        .post(
            "/listings",
            Some(&seller),
            listing_body("http.shop", 400, TestDependencies::CAPTCHA_ANSWER),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let listing_id = listing["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .post(
            &format!("/listings/{}/review", listing_id),
            Some(&seller),
            json!({ "decision": "approve" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, approved) = app
        .post(
            &format!("/listings/{}/review", listing_id),
            Some(&admin),
            json!({ "decision": "approve" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "approved");

    // Buy it
    let (status, intent) = app
        .post("/purchases", Some(&buyer), json!({ "listing_id": listing_id }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let intent_id = intent["id"].as_str().unwrap().to_string();

    let (status, completed) = app
        .post(
            &format!("/purchases/{}/complete", intent_id),
            Some(&buyer),
            json!({ "method": "wallet" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["status"], "completed");

    let (_, wallet) = app.get("/wallet", Some(&buyer)).await;
    assert_eq!(wallet["balance"], 600);
    let (_, wallet) = app.get("/wallet", Some(&seller)).await;
    assert_eq!(wallet["balance"], 400);

    let (status, sold) = app.get(&format!("/listings/{}", listing_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sold["status"], "sold");
    assert_eq!(sold["owner_id"], buyer_id.to_string());

    // A second purchase attempt finds nothing to buy
    let (status, body) = app
        .post("/purchases", Some(&buyer), json!({ "listing_id": listing_id }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{}", body);
}

#[tokio::test]
async fn insufficient_funds_maps_to_payment_required() {
    let app = TestApp::new();
    let seller_id = AccountId::new();
    let buyer_id = AccountId::new();
    let seller = app.token(seller_id, Role::Seller);
    let buyer = app.token(buyer_id, Role::Buyer);
    let admin = app.token(AccountId::new(), Role::Admin);

    app.post("/wallet", Some(&seller), json!({})).await;
    app.post("/wallet", Some(&buyer), json!({})).await;

    let (_, listing) = app
        .post(
            "/listings",
            Some(&seller),
            listing_body("dear.com", 900, TestDependencies::CAPTCHA_ANSWER),
        )
        .await;
    let listing_id = listing["id"].as_str().unwrap().to_string();
    app.post(
        &format!("/listings/{}/review", listing_id),
        Some(&admin),
        json!({ "decision": "approve" }),
    )
    .await;

    let (_, intent) = app
        .post("/purchases", Some(&buyer), json!({ "listing_id": listing_id }))
        .await;
    let intent_id = intent["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .post(
            &format!("/purchases/{}/complete", intent_id),
            Some(&buyer),
            json!({ "method": "wallet" }),
        )
        .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["error"], "insufficient_funds");

    let (_, intent) = app
        .get(&format!("/purchases/{}", intent_id), Some(&buyer))
        .await;
    assert_eq!(intent["status"], "failed");
}
