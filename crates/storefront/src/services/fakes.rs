//! In-memory collaborators for unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rhema_core::{
    Book, BookFormat, BookId, BookStatus, CartId, CartItem, CartLine, Money, NewOrder, Order,
    PostalCode, ResolvedAddress, UserId,
};

use super::address::{AddressError, AddressLookup};
use super::auth::{AuthError, TokenVerifier, VerifiedUser};
use super::cart::{CartError, CartPersistence, GuestCartStorage};
use super::catalog::Catalog;
use super::notify::{NotifyError, OrderNotification, WebhookSink};
use super::orders::OrderLedger;
use super::payment::{PaymentError, PaymentGateway, PaymentRedirect};
use super::settings::SettingsStore;
use crate::db::RepositoryError;

/// A listed book with a fresh id.
pub fn book(title: &str, cents: i64, format: BookFormat) -> Book {
    Book {
        id: BookId::generate(),
        title: title.to_string(),
        author: "Autor".to_string(),
        category: "Teologia".to_string(),
        description: String::new(),
        price: Money::from_cents(cents),
        old_price: None,
        cover_url: String::new(),
        status: BookStatus::Active,
        format,
        stock: None,
        isbn: String::new(),
        long_description: None,
        benefits: Vec::new(),
    }
}

fn unavailable() -> RepositoryError {
    RepositoryError::Database(sqlx::Error::PoolTimedOut)
}

#[derive(Default)]
pub struct InMemoryCatalog {
    books: Vec<Book>,
}

impl InMemoryCatalog {
    pub fn with_books(books: impl IntoIterator<Item = Book>) -> Self {
        Self {
            books: books.into_iter().collect(),
        }
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn list_books(&self, listed_only: bool) -> Result<Vec<Book>, RepositoryError> {
        Ok(self
            .books
            .iter()
            .filter(|b| !listed_only || b.status.is_listed())
            .cloned()
            .collect())
    }

    async fn get_book(&self, id: BookId) -> Result<Option<Book>, RepositoryError> {
        Ok(self.books.iter().find(|b| b.id == id).cloned())
    }
}

/// Remote carts keyed by user, lines kept in insertion order.
#[derive(Default)]
pub struct InMemoryCarts {
    books: HashMap<BookId, Book>,
    carts: Mutex<HashMap<UserId, CartId>>,
    lines: Mutex<HashMap<CartId, Vec<CartLine>>>,
    fail_writes: AtomicBool,
}

impl InMemoryCarts {
    pub fn with_books(books: impl IntoIterator<Item = Book>) -> Self {
        Self {
            books: books.into_iter().map(|b| (b.id, b)).collect(),
            ..Self::default()
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), RepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(unavailable())
        } else {
            Ok(())
        }
    }

    fn put(lines: &mut Vec<CartLine>, line: CartLine) {
        match lines.iter_mut().find(|l| l.book_id == line.book_id) {
            Some(existing) => existing.quantity = line.quantity,
            None => lines.push(line),
        }
    }
}

#[async_trait]
impl CartPersistence for InMemoryCarts {
    async fn get_or_create_cart(&self, user_id: UserId) -> Result<CartId, RepositoryError> {
        Ok(*self
            .carts
            .lock()
            .unwrap()
            .entry(user_id)
            .or_insert_with(CartId::generate))
    }

    async fn list_items(&self, cart_id: CartId) -> Result<Vec<CartItem>, RepositoryError> {
        let lines = self.lines.lock().unwrap();
        Ok(lines
            .get(&cart_id)
            .map(|lines| {
                lines
                    .iter()
                    .filter_map(|line| {
                        self.books
                            .get(&line.book_id)
                            .map(|b| CartItem::from_book(b, line.quantity))
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn upsert_item(&self, cart_id: CartId, line: CartLine) -> Result<(), RepositoryError> {
        self.check_writable()?;
        Self::put(self.lines.lock().unwrap().entry(cart_id).or_default(), line);
        Ok(())
    }

    async fn upsert_items(
        &self,
        cart_id: CartId,
        lines: &[CartLine],
    ) -> Result<(), RepositoryError> {
        self.check_writable()?;
        let mut all = self.lines.lock().unwrap();
        let cart = all.entry(cart_id).or_default();
        for line in lines {
            Self::put(cart, *line);
        }
        Ok(())
    }

    async fn delete_item(&self, cart_id: CartId, book_id: BookId) -> Result<(), RepositoryError> {
        self.check_writable()?;
        if let Some(lines) = self.lines.lock().unwrap().get_mut(&cart_id) {
            lines.retain(|l| l.book_id != book_id);
        }
        Ok(())
    }

    async fn clear_cart(&self, cart_id: CartId) -> Result<(), RepositoryError> {
        self.check_writable()?;
        self.lines.lock().unwrap().remove(&cart_id);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryGuestCart {
    items: Mutex<Vec<CartItem>>,
}

impl MemoryGuestCart {
    pub fn with_items(items: Vec<CartItem>) -> Self {
        Self {
            items: Mutex::new(items),
        }
    }

    pub fn items(&self) -> Vec<CartItem> {
        self.items.lock().unwrap().clone()
    }
}

#[async_trait]
impl GuestCartStorage for MemoryGuestCart {
    async fn load(&self) -> Result<Vec<CartItem>, CartError> {
        Ok(self.items())
    }

    async fn save(&self, items: &[CartItem]) -> Result<(), CartError> {
        *self.items.lock().unwrap() = items.to_vec();
        Ok(())
    }

    async fn clear(&self) -> Result<(), CartError> {
        self.items.lock().unwrap().clear();
        Ok(())
    }
}

/// Answers from a fixed table keyed by the eight digits.
#[derive(Default)]
pub struct StaticLookup {
    addresses: HashMap<String, ResolvedAddress>,
}

impl StaticLookup {
    pub fn with_address(digits: &str, address: ResolvedAddress) -> Self {
        Self {
            addresses: HashMap::from([(digits.to_string(), address)]),
        }
    }
}

#[async_trait]
impl AddressLookup for StaticLookup {
    async fn lookup(&self, code: &PostalCode) -> Result<Option<ResolvedAddress>, AddressError> {
        Ok(self.addresses.get(code.digits()).cloned())
    }
}

#[derive(Default)]
pub struct FakeLedger {
    orders: Mutex<Vec<Order>>,
    fail_writes: AtomicBool,
}

impl FakeLedger {
    pub fn orders(&self) -> Vec<Order> {
        self.orders.lock().unwrap().clone()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl OrderLedger for FakeLedger {
    async fn create_order(&self, order: &NewOrder) -> Result<DateTime<Utc>, RepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let created_at = Utc::now();
        self.orders
            .lock()
            .unwrap()
            .push(Order::from_new(order.clone(), created_at));
        Ok(created_at)
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let mut orders: Vec<Order> = self
            .orders()
            .into_iter()
            .filter(|o| o.user_id == Some(user_id))
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }
}

/// Records the return URLs it was called with.
#[derive(Default)]
pub struct FakeGateway {
    return_urls: Mutex<Vec<String>>,
    missing_token: AtomicBool,
}

impl FakeGateway {
    pub fn return_urls(&self) -> Vec<String> {
        self.return_urls.lock().unwrap().clone()
    }

    pub fn fail_with_missing_token(&self, fail: bool) {
        self.missing_token.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_preference(
        &self,
        order: &NewOrder,
        return_url: &str,
    ) -> Result<PaymentRedirect, PaymentError> {
        if self.missing_token.load(Ordering::SeqCst) {
            return Err(PaymentError::MissingAccessToken);
        }
        self.return_urls.lock().unwrap().push(return_url.to_string());
        Ok(PaymentRedirect {
            preference_id: Some(format!("pref-{}", order.id)),
            init_point: format!("https://pay.example.com/checkout?pref={}", order.id),
            sandbox_init_point: None,
        })
    }
}

/// Fixed settings pairs.
#[derive(Default)]
pub struct StaticSettings {
    pairs: Vec<(String, String)>,
}

impl StaticSettings {
    pub fn webhook(url: &str) -> Self {
        Self {
            pairs: vec![
                (
                    rhema_core::settings::KEY_SHEETS_URL.to_string(),
                    url.to_string(),
                ),
                (
                    rhema_core::settings::KEY_SHEETS_ENABLED.to_string(),
                    "true".to_string(),
                ),
            ],
        }
    }
}

#[async_trait]
impl SettingsStore for StaticSettings {
    async fn load_pairs(&self) -> Result<Vec<(String, String)>, RepositoryError> {
        Ok(self.pairs.clone())
    }
}

/// Keeps every delivered notification.
#[derive(Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<OrderNotification>>,
}

impl RecordingSink {
    /// Wait until at least `count` notifications arrived.
    pub async fn wait_for(&self, count: usize) -> Vec<OrderNotification> {
        for _ in 0..200 {
            {
                let delivered = self.delivered.lock().unwrap();
                if delivered.len() >= count {
                    return delivered.clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {count} notifications");
    }

    pub fn delivered(&self) -> Vec<OrderNotification> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebhookSink for RecordingSink {
    async fn deliver(&self, notification: &OrderNotification) -> Result<(), NotifyError> {
        self.delivered.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Settings store that is always down.
pub struct BrokenSettings;

#[async_trait]
impl SettingsStore for BrokenSettings {
    async fn load_pairs(&self) -> Result<Vec<(String, String)>, RepositoryError> {
        Err(unavailable())
    }
}

/// Rejects every delivery, counting the attempts.
#[derive(Default)]
pub struct RejectingSink {
    attempts: AtomicUsize,
}

impl RejectingSink {
    /// Wait until at least `count` deliveries were attempted.
    pub async fn wait_for(&self, count: usize) {
        for _ in 0..200 {
            if self.attempts.load(Ordering::SeqCst) >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {count} delivery attempts");
    }
}

#[async_trait]
impl WebhookSink for RejectingSink {
    async fn deliver(&self, _notification: &OrderNotification) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(NotifyError::Status(500))
    }
}

/// Never finishes a delivery.
pub struct StalledSink;

#[async_trait]
impl WebhookSink for StalledSink {
    async fn deliver(&self, _notification: &OrderNotification) -> Result<(), NotifyError> {
        std::future::pending().await
    }
}

/// Accepts a fixed set of access tokens.
#[derive(Default)]
pub struct StaticTokens {
    users: HashMap<String, VerifiedUser>,
}

impl StaticTokens {
    pub fn with_user(token: &str, user: VerifiedUser) -> Self {
        Self {
            users: HashMap::from([(token.to_string(), user)]),
        }
    }
}

#[async_trait]
impl TokenVerifier for StaticTokens {
    async fn verify(&self, access_token: &str) -> Result<VerifiedUser, AuthError> {
        self.users
            .get(access_token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}
