//! `PostgreSQL` row mappings.
//!
//! Enum columns are stored as text and parsed on the way out, so a bad value
//! in the database surfaces as a [`RowError`] rather than a panic.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::cart::CartItem;
use crate::catalog::Book;
use crate::order::{Order, OrderItem};
use crate::types::{BookFormat, BookId, BookStatus, Money, OrderId, OrderStatus, UserId};

/// A row held a value the domain types reject.
#[derive(Debug, thiserror::Error)]
pub enum RowError {
    #[error("invalid {column}: {reason}")]
    InvalidValue {
        column: &'static str,
        reason: String,
    },
}

fn invalid(column: &'static str, reason: impl Into<String>) -> RowError {
    RowError::InvalidValue {
        column,
        reason: reason.into(),
    }
}

fn quantity(column: &'static str, value: i32) -> Result<u32, RowError> {
    u32::try_from(value)
        .ok()
        .filter(|q| *q >= 1)
        .ok_or_else(|| invalid(column, format!("quantity {value} is below 1")))
}

/// `books` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BookRow {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub category: String,
    pub description: String,
    pub price: Money,
    pub old_price: Option<Money>,
    pub cover_url: String,
    pub status: String,
    pub format: String,
    pub stock: Option<i32>,
    pub isbn: String,
    pub long_description: Option<String>,
    pub benefits: Vec<String>,
}

impl TryFrom<BookRow> for Book {
    type Error = RowError;

    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        let status: BookStatus = row.status.parse().map_err(|e| invalid("status", e))?;
        let format: BookFormat = row.format.parse().map_err(|e| invalid("format", e))?;
        Ok(Self {
            id: row.id,
            title: row.title,
            author: row.author,
            category: row.category,
            description: row.description,
            price: row.price,
            old_price: row.old_price,
            cover_url: row.cover_url,
            status,
            format,
            stock: row.stock,
            isbn: row.isbn,
            long_description: row.long_description,
            benefits: row.benefits,
        })
    }
}

/// `cart_items` joined with the current `books` row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CartItemRow {
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    pub category: String,
    pub price: Money,
    pub cover_url: String,
    pub format: String,
    pub stock: Option<i32>,
    pub quantity: i32,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = RowError;

    fn try_from(row: CartItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            book_id: row.book_id,
            title: row.title,
            author: row.author,
            category: row.category,
            price: row.price,
            cover_url: row.cover_url,
            format: row.format.parse().map_err(|e| invalid("format", e))?,
            stock: row.stock,
            quantity: quantity("cart_items.quantity", row.quantity)?,
        })
    }
}

/// `orders` table, without items.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderRow {
    pub id: OrderId,
    pub user_id: Option<UserId>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub address: String,
    pub city: String,
    pub zip: String,
    pub payment_method: String,
    pub status: String,
    pub amount: Money,
    pub shipping_cost: Option<Money>,
    pub shipping_method: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// `order_items` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderItemRow {
    pub order_id: OrderId,
    pub book_id: Option<BookId>,
    pub title: String,
    pub quantity: i32,
    pub price: Money,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RowError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            book_id: row.book_id,
            title: row.title,
            quantity: quantity("order_items.quantity", row.quantity)?,
            price: row.price,
        })
    }
}

/// Stitch order rows and their item rows back into [`Order`]s.
///
/// Output keeps the order of `orders`; items keep the order of `items`.
///
/// # Errors
///
/// Returns [`RowError`] if any status or quantity is invalid.
pub fn assemble_orders(
    orders: Vec<OrderRow>,
    items: Vec<OrderItemRow>,
) -> Result<Vec<Order>, RowError> {
    let mut by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
    for row in items {
        let order_id = row.order_id;
        by_order
            .entry(order_id)
            .or_default()
            .push(OrderItem::try_from(row)?);
    }

    orders
        .into_iter()
        .map(|row| {
            let status: OrderStatus = row.status.parse().map_err(|e| invalid("status", e))?;
            Ok(Order {
                id: row.id,
                user_id: row.user_id,
                customer_name: row.customer_name,
                customer_email: row.customer_email,
                customer_phone: row.customer_phone,
                address: row.address,
                city: row.city,
                zip: row.zip,
                payment_method: row.payment_method,
                status,
                amount: row.amount,
                shipping_cost: row.shipping_cost,
                shipping_method: row.shipping_method,
                created_at: row.created_at,
                items: by_order.remove(&row.id).unwrap_or_default(),
            })
        })
        .collect()
}
