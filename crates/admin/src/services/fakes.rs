//! In-memory collaborators for unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use rhema_core::{
    Book, BookFormat, BookId, BookStatus, Money, Order, OrderId, OrderStatus, OrderUpdate,
    ProfileRole, UserId,
};

use super::auth::{AuthError, RoleLookup, TokenVerifier, VerifiedUser};
use super::catalog::BookCatalog;
use super::orders::OrderAdmin;
use super::settings::SettingsStore;
use crate::db::RepositoryError;

pub fn order(customer: &str, status: OrderStatus, cents: i64) -> Order {
    Order {
        id: OrderId::generate(),
        user_id: None,
        customer_name: customer.to_string(),
        customer_email: format!("{}@example.com", customer.to_lowercase().replace(' ', ".")),
        customer_phone: "69999990000".to_string(),
        address: "Av. Sete de Setembro, 100, Centro".to_string(),
        city: "Porto Velho / RO".to_string(),
        zip: "76800-000".to_string(),
        payment_method: "Mercado Pago".to_string(),
        status,
        amount: Money::from_cents(cents),
        shipping_cost: Some(Money::ZERO),
        shipping_method: None,
        created_at: Utc::now(),
        items: Vec::new(),
    }
}

pub fn book(title: &str, status: BookStatus) -> Book {
    Book {
        id: BookId::generate(),
        title: title.to_string(),
        author: "Rhema".to_string(),
        category: "Devocional".to_string(),
        description: String::new(),
        price: Money::from_cents(2490),
        old_price: None,
        cover_url: format!("https://cdn.example.com/{}.jpg", title.len()),
        status,
        format: BookFormat::Digital,
        stock: None,
        isbn: String::new(),
        long_description: None,
        benefits: Vec::new(),
    }
}

#[derive(Default)]
pub struct InMemoryOrders {
    orders: Mutex<Vec<Order>>,
}

impl InMemoryOrders {
    pub fn with_orders(orders: Vec<Order>) -> Self {
        Self {
            orders: Mutex::new(orders),
        }
    }

    pub fn orders(&self) -> Vec<Order> {
        self.orders.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrderAdmin for InMemoryOrders {
    async fn list_orders(&self) -> Result<Vec<Order>, RepositoryError> {
        Ok(self.orders())
    }

    async fn update_order(
        &self,
        id: OrderId,
        update: &OrderUpdate,
    ) -> Result<bool, RepositoryError> {
        let mut orders = self.orders.lock().unwrap();
        let Some(order) = orders.iter_mut().find(|o| o.id == id) else {
            return Ok(false);
        };
        if let Some(status) = update.status {
            order.status = status;
        }
        if let Some(method) = &update.payment_method {
            order.payment_method.clone_from(method);
        }
        Ok(true)
    }

    async fn delete_order(&self, id: OrderId) -> Result<bool, RepositoryError> {
        let mut orders = self.orders.lock().unwrap();
        let before = orders.len();
        orders.retain(|o| o.id != id);
        Ok(orders.len() < before)
    }
}

#[derive(Default)]
pub struct InMemoryBooks {
    books: Vec<Book>,
}

impl InMemoryBooks {
    pub fn with_books(books: Vec<Book>) -> Self {
        Self { books }
    }
}

#[async_trait]
impl BookCatalog for InMemoryBooks {
    async fn list_books(&self) -> Result<Vec<Book>, RepositoryError> {
        Ok(self.books.clone())
    }
}

#[derive(Default)]
pub struct InMemorySettings {
    pairs: Mutex<HashMap<String, String>>,
}

impl InMemorySettings {
    pub fn with_pairs<const N: usize>(pairs: [(&str, &str); N]) -> Self {
        Self {
            pairs: Mutex::new(
                pairs
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl SettingsStore for InMemorySettings {
    async fn load_pairs(&self) -> Result<Vec<(String, String)>, RepositoryError> {
        Ok(self
            .pairs
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn upsert_pairs(&self, pairs: &[(&'static str, String)]) -> Result<(), RepositoryError> {
        let mut stored = self.pairs.lock().unwrap();
        for (key, value) in pairs {
            stored.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }
}

/// Tokens and profile roles for a fixed set of users.
#[derive(Default)]
pub struct StaticDirectory {
    tokens: HashMap<String, VerifiedUser>,
    roles: Mutex<HashMap<UserId, ProfileRole>>,
}

impl StaticDirectory {
    pub fn with_user(mut self, token: &str, email: &str, role: Option<ProfileRole>) -> Self {
        let id = UserId::generate();
        self.tokens.insert(
            token.to_string(),
            VerifiedUser {
                id,
                email: email.to_string(),
            },
        );
        if let Some(role) = role {
            self.roles.lock().unwrap().insert(id, role);
        }
        self
    }

    pub fn set_role(&self, token: &str, role: ProfileRole) {
        let id = self.tokens[token].id;
        self.roles.lock().unwrap().insert(id, role);
    }
}

#[async_trait]
impl TokenVerifier for StaticDirectory {
    async fn verify(&self, access_token: &str) -> Result<VerifiedUser, AuthError> {
        self.tokens
            .get(access_token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}

#[async_trait]
impl RoleLookup for StaticDirectory {
    async fn role_of(&self, user_id: UserId) -> Result<Option<ProfileRole>, RepositoryError> {
        Ok(self.roles.lock().unwrap().get(&user_id).copied())
    }
}
