//! Orders (sales) and their line items.
//!
//! The storefront only ever creates orders. Status and payment-method changes
//! and deletions belong to the back office, or to an out-of-band payment
//! notification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{BookId, Money, OrderId, OrderStatus, UserId};

/// Payment method label stored on orders placed through the storefront.
pub const DEFAULT_PAYMENT_METHOD: &str = "Mercado Pago";

/// A line on an order, snapshotted at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Catalog book this line came from. `None` once the book was deleted.
    pub book_id: Option<BookId>,
    pub title: String,
    pub quantity: u32,
    /// Unit price at submission time.
    pub price: Money,
}

impl OrderItem {
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.price.times(self.quantity)
    }
}

/// An order ready to be written to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub id: OrderId,
    /// Owning customer, or `None` for guest checkouts.
    pub user_id: Option<UserId>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    /// `street, number[ - complement], neighborhood`
    pub address: String,
    /// `city / STATE`
    pub city: String,
    pub zip: String,
    pub payment_method: String,
    pub status: OrderStatus,
    /// Subtotal plus shipping.
    pub amount: Money,
    pub shipping_cost: Option<Money>,
    pub shipping_method: Option<String>,
    pub items: Vec<OrderItem>,
}

/// A stored order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: Option<UserId>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub address: String,
    pub city: String,
    pub zip: String,
    pub payment_method: String,
    pub status: OrderStatus,
    pub amount: Money,
    pub shipping_cost: Option<Money>,
    pub shipping_method: Option<String>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Attach the ledger timestamp to a freshly written order.
    #[must_use]
    pub fn from_new(order: NewOrder, created_at: DateTime<Utc>) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            customer_name: order.customer_name,
            customer_email: order.customer_email,
            customer_phone: order.customer_phone,
            address: order.address,
            city: order.city,
            zip: order.zip,
            payment_method: order.payment_method,
            status: order.status,
            amount: order.amount,
            shipping_cost: order.shipping_cost,
            shipping_method: order.shipping_method,
            created_at,
            items: order.items,
        }
    }

    /// Case-insensitive match on customer name or email, or a substring of the id.
    #[must_use]
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.trim();
        if term.is_empty() {
            return true;
        }
        let needle = term.to_lowercase();
        self.customer_name.to_lowercase().contains(&needle)
            || self.customer_email.to_lowercase().contains(&needle)
            || self.id.to_string().contains(&needle)
    }
}

/// Fields the back office may change on an existing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
    pub payment_method: Option<String>,
}

impl OrderUpdate {
    /// Whether the update would change nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.status.is_none() && self.payment_method.is_none()
    }
}
