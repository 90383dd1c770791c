//! End-to-end API tests over in-memory collaborators.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use axum::Router;
use rhema_core::{Book, BookFormat, BookId, CartLine, Money, ResolvedAddress, UserId};
use serde_json::{Value, json};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use tower_sessions::{MemoryStore, SessionManagerLayer};

use crate::config::StorefrontConfig;
use crate::services::auth::VerifiedUser;
use crate::services::fakes::{
    FakeGateway, FakeLedger, InMemoryCarts, InMemoryCatalog, RecordingSink, StaticLookup,
    StaticSettings, StaticTokens, book,
};
use crate::services::{CartPersistence, TableRateProvider};
use crate::state::{AppState, Collaborators};

struct TestApp {
    router: Router,
    cookie: Option<String>,
    carts: Arc<InMemoryCarts>,
    ledger: Arc<FakeLedger>,
    ebook: Book,
    printed: Book,
    user_id: UserId,
}

impl TestApp {
    fn new() -> Self {
        let ebook = book("Ebook X", 2490, BookFormat::Digital);
        let printed = book("Physical Book Y", 5990, BookFormat::Physical);
        let user_id = UserId::generate();

        let carts = Arc::new(InMemoryCarts::with_books([ebook.clone(), printed.clone()]));
        let ledger = Arc::new(FakeLedger::default());
        let collaborators = Collaborators {
            catalog: Arc::new(InMemoryCatalog::with_books([ebook.clone(), printed.clone()])),
            carts: carts.clone(),
            ledger: ledger.clone(),
            settings: Arc::new(StaticSettings::default()),
            address_lookup: Arc::new(StaticLookup::with_address(
                "76800000",
                ResolvedAddress {
                    street: "Av. Sete de Setembro".to_string(),
                    neighborhood: "Centro".to_string(),
                    city: "Porto Velho".to_string(),
                    region: "RO".to_string(),
                },
            )),
            rates: Arc::new(TableRateProvider::new(Duration::ZERO)),
            payments: Arc::new(FakeGateway::default()),
            webhooks: Arc::new(RecordingSink::default()),
            tokens: Arc::new(StaticTokens::with_user(
                "token-ana",
                VerifiedUser {
                    id: user_id,
                    email: "ana@example.com".to_string(),
                },
            )),
        };

        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        let (state, _worker) =
            AppState::with_collaborators(StorefrontConfig::for_tests(), pool, collaborators);
        let sessions = SessionManagerLayer::new(MemoryStore::default()).with_secure(false);

        Self {
            router: crate::app(state, sessions, false),
            cookie: None,
            carts,
            ledger,
            ebook,
            printed,
            user_id,
        }
    }

    async fn call(&mut self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(cookie) = &self.cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_string());
        }

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn get(&mut self, uri: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, None).await
    }

    async fn post(&mut self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(body)).await
    }

    async fn fill_details(&mut self) {
        let (status, _) = self
            .post(
                "/api/checkout/contact",
                json!({
                    "email": "ana@example.com",
                    "phone": "69999990000",
                    "first_name": "Ana",
                    "last_name": "Lima",
                    "number": "100"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = self
            .post("/api/checkout/postal-code", json!({"postal_code": "76800000"}))
            .await;
        assert_eq!(status, StatusCode::OK);
    }
}

fn money(value: &Value) -> Money {
    serde_json::from_value(value.clone()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let mut app = TestApp::new();
    let (status, _) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_guest_cart_totals() {
    let mut app = TestApp::new();
    let ebook = app.ebook.id;
    let printed = app.printed.id;

    app.post("/api/cart/add", json!({"book_id": ebook})).await;
    app.post("/api/cart/add", json!({"book_id": printed})).await;
    let (status, cart) = app
        .post("/api/cart/update", json!({"book_id": ebook, "delta": 2}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["total_items"], 4);
    assert_eq!(money(&cart["total_price"]), Money::from_cents(2490 * 3 + 5990));
    assert_eq!(cart["has_physical_items"], true);

    let (_, cart) = app.post("/api/cart/remove", json!({"book_id": printed})).await;
    assert_eq!(cart["total_items"], 3);

    let (_, cart) = app.get("/api/cart").await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_adding_unknown_book_is_not_found() {
    let mut app = TestApp::new();
    let (status, body) = app
        .post("/api/cart/add", json!({"book_id": BookId::generate()}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_empty_cart_cannot_start_checkout() {
    let mut app = TestApp::new();
    let (status, _) = app.post("/api/checkout/start", json!({"source": "cart"})).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_physical_checkout_end_to_end() {
    let mut app = TestApp::new();
    let printed = app.printed.id;
    app.post("/api/cart/add", json!({"book_id": printed})).await;

    let (status, view) = app.post("/api/checkout/start", json!({"source": "cart"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["step"], "details");

    // Submitting from the details step is refused.
    let (status, _) = app.post("/api/checkout/submit", json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    app.fill_details().await;
    let (_, view) = app
        .post("/api/checkout/shipping", json!({"option_id": "sedex"}))
        .await;
    assert_eq!(view["address"]["city"], "Porto Velho");
    assert_eq!(view["address"]["postal_code"], "76800-000");
    assert_eq!(money(&view["total"]), Money::from_cents(5990 + 8033));

    let (status, view) = app.post("/api/checkout/details", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["step"], "payment");

    let (status, submitted) = app.post("/api/checkout/submit", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(submitted["redirect_url"].as_str().unwrap().starts_with("https://"));

    let orders = app.ledger.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].amount, Money::from_cents(14023));
    assert_eq!(orders[0].user_id, None);

    let (status, view) = app.get("/checkout/return?status=success").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["step"], "success");

    let (_, cart) = app.get("/api/cart").await;
    assert_eq!(cart["total_items"], 0);
}

#[tokio::test]
async fn test_missing_fields_are_reported_together() {
    let mut app = TestApp::new();
    let ebook = app.ebook.id;
    app.post("/api/cart/add", json!({"book_id": ebook})).await;
    app.post("/api/checkout/start", json!({"source": "cart"})).await;

    let (status, body) = app.post("/api/checkout/details", json!({})).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("email"));
    assert!(message.contains("postal code"));

    let (_, view) = app.get("/api/checkout").await;
    assert_eq!(view["step"], "details");
}

#[tokio::test]
async fn test_failed_return_stays_in_payment() {
    let mut app = TestApp::new();
    let ebook = app.ebook.id;
    app.post("/api/cart/add", json!({"book_id": ebook})).await;
    app.post("/api/checkout/start", json!({"source": "cart"})).await;
    app.fill_details().await;
    app.post("/api/checkout/details", json!({})).await;
    app.post("/api/checkout/submit", json!({})).await;

    let (status, view) = app.get("/checkout/return?status=failure").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["step"], "payment");
    assert!(view["notice"].is_string());
    let (_, cart) = app.get("/api/cart").await;
    assert_eq!(cart["total_items"], 1);
}

#[tokio::test]
async fn test_buy_now_leaves_cart_alone() {
    let mut app = TestApp::new();
    let ebook = app.ebook.id;
    let printed = app.printed.id;
    app.post("/api/cart/add", json!({"book_id": printed})).await;

    let (status, view) = app
        .post("/api/checkout/start", json!({"source": ebook.to_string()}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["items"].as_array().unwrap().len(), 1);
    assert_eq!(view["has_physical_items"], false);

    app.fill_details().await;
    app.post("/api/checkout/details", json!({})).await;
    app.post("/api/checkout/submit", json!({})).await;
    let (_, view) = app.get("/checkout/return?status=success").await;
    assert_eq!(view["step"], "success");

    let order = &app.ledger.orders()[0];
    assert_eq!(order.amount, Money::from_cents(2490));
    assert_eq!(order.shipping_cost, Some(Money::ZERO));

    let (_, cart) = app.get("/api/cart").await;
    assert_eq!(cart["total_items"], 1);
}

#[tokio::test]
async fn test_sign_in_merges_guest_cart() {
    let mut app = TestApp::new();
    let ebook = app.ebook.id;
    let printed = app.printed.id;

    let cart_id = app.carts.get_or_create_cart(app.user_id).await.unwrap();
    app.carts
        .upsert_item(
            cart_id,
            CartLine {
                book_id: printed,
                quantity: 4,
            },
        )
        .await
        .unwrap();

    app.post("/api/cart/add", json!({"book_id": ebook})).await;
    app.post("/api/cart/add", json!({"book_id": printed})).await;

    let (status, user) = app
        .post("/auth/session", json!({"access_token": "token-ana"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["email"], "ana@example.com");

    let (_, cart) = app.get("/api/cart").await;
    // Guest quantity wins for the book in both carts.
    assert_eq!(cart["total_items"], 2);
    let remote = app.carts.list_items(cart_id).await.unwrap();
    assert_eq!(remote.len(), 2);
    assert!(remote.iter().all(|item| item.quantity == 1));
}

#[tokio::test]
async fn test_order_history_requires_sign_in() {
    let mut app = TestApp::new();
    let (status, _) = app.get("/api/account/orders").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .post("/auth/session", json!({"access_token": "bogus"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signed_in_orders_are_listed() {
    let mut app = TestApp::new();
    app.post("/auth/session", json!({"access_token": "token-ana"}))
        .await;
    let printed = app.printed.id;
    app.post("/api/cart/add", json!({"book_id": printed})).await;
    app.post("/api/checkout/start", json!({"source": "cart"})).await;
    app.fill_details().await;
    app.post("/api/checkout/details", json!({})).await;
    let (status, _) = app.post("/api/checkout/submit", json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, orders) = app.get("/api/account/orders").await;
    assert_eq!(status, StatusCode::OK);
    let orders = orders.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["status"], "Aguardando");
    assert_eq!(orders[0]["shipping_method"], "Retirar na Igreja");

    let (status, _) = app.call(Method::POST, "/auth/logout", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get("/api/account/orders").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
