//! Order ledger management: listing, filtering, edits and export.
//!
//! Listing, filtering and stats are pure functions over the full ledger so
//! they can be tested without a database.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use rhema_core::{Money, Order, OrderId, OrderStatus, OrderUpdate};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument};

use crate::db::RepositoryError;

/// Label the back office uses for "no status filter".
pub const ALL_STATUSES: &str = "Todos";

/// UTF-8 byte order mark so spreadsheet tools pick the right encoding.
const CSV_BOM: char = '\u{feff}';

const CSV_HEADERS: [&str; 12] = [
    "ID Pedido",
    "Cliente",
    "Email",
    "Telefone",
    "Endereço",
    "Cidade",
    "CEP",
    "Data",
    "Método",
    "Status",
    "Valor Total",
    "Itens",
];

/// Errors from order management.
#[derive(Debug, Error)]
pub enum OrdersError {
    #[error("order {0} not found")]
    NotFound(OrderId),

    #[error("nothing to update")]
    EmptyUpdate,

    #[error("payment method cannot be blank")]
    BlankPaymentMethod,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Storage of the order ledger, as seen by the back office.
#[async_trait]
pub trait OrderAdmin: Send + Sync {
    /// Every order with its items, newest first.
    async fn list_orders(&self) -> Result<Vec<Order>, RepositoryError>;

    /// Apply an update. Returns `false` if the order does not exist.
    async fn update_order(&self, id: OrderId, update: &OrderUpdate)
    -> Result<bool, RepositoryError>;

    /// Delete an order and its items. Returns `false` if it did not exist.
    async fn delete_order(&self, id: OrderId) -> Result<bool, RepositoryError>;
}

/// Status filter of the order list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(OrderStatus),
}

impl StatusFilter {
    fn matches(self, order: &Order) -> bool {
        match self {
            Self::All => true,
            Self::Only(status) => order.status == status,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s == ALL_STATUSES {
            return Ok(Self::All);
        }
        s.parse().map(Self::Only)
    }
}

/// Totals shown above the order list.
///
/// Computed over the whole ledger, not the filtered rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderStats {
    pub total_amount: Money,
    pub awaiting_count: usize,
}

impl OrderStats {
    #[must_use]
    pub fn of(orders: &[Order]) -> Self {
        Self {
            total_amount: orders.iter().map(|o| o.amount).sum(),
            awaiting_count: orders
                .iter()
                .filter(|o| o.status == OrderStatus::Awaiting)
                .count(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderListing {
    pub orders: Vec<Order>,
    pub stats: OrderStats,
}

/// Keep the orders matching both the status filter and the search term.
#[must_use]
pub fn filter_orders(orders: Vec<Order>, status: StatusFilter, search: &str) -> Vec<Order> {
    orders
        .into_iter()
        .filter(|order| status.matches(order) && order.matches_search(search))
        .collect()
}

fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Semicolon-separated export of the given orders, every field quoted.
#[must_use]
pub fn export_csv(orders: &[Order]) -> String {
    let mut lines = Vec::with_capacity(orders.len() + 1);
    lines.push(
        CSV_HEADERS
            .iter()
            .map(|h| csv_field(h))
            .collect::<Vec<_>>()
            .join(";"),
    );

    for order in orders {
        let items = order
            .items
            .iter()
            .map(|item| format!("{} (x{})", item.title, item.quantity))
            .collect::<Vec<_>>()
            .join(" | ");
        let fields = [
            order.id.to_string(),
            order.customer_name.clone(),
            order.customer_email.clone(),
            order.customer_phone.clone(),
            order.address.clone(),
            order.city.clone(),
            order.zip.clone(),
            order.created_at.format("%d/%m/%Y %H:%M").to_string(),
            order.payment_method.clone(),
            order.status.to_string(),
            order.amount.to_string(),
            items,
        ];
        lines.push(
            fields
                .iter()
                .map(|f| csv_field(f))
                .collect::<Vec<_>>()
                .join(";"),
        );
    }

    format!("{CSV_BOM}{}", lines.join("\n"))
}

/// Back-office operations on the order ledger.
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn OrderAdmin>,
}

impl OrderService {
    #[must_use]
    pub fn new(store: Arc<dyn OrderAdmin>) -> Self {
        Self { store }
    }

    /// Every order, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be read.
    pub async fn list_all(&self) -> Result<Vec<Order>, OrdersError> {
        Ok(self.store.list_orders().await?)
    }

    /// Filtered orders plus stats over the whole ledger.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be read.
    #[instrument(skip(self))]
    pub async fn list(&self, status: StatusFilter, search: &str) -> Result<OrderListing, OrdersError> {
        let all = self.store.list_orders().await?;
        let stats = OrderStats::of(&all);
        Ok(OrderListing {
            orders: filter_orders(all, status, search),
            stats,
        })
    }

    /// Change the status and/or the payment method label of an order.
    ///
    /// # Errors
    ///
    /// Returns an error if the update is empty or blank, the order does not
    /// exist, or the ledger write fails.
    #[instrument(skip(self))]
    pub async fn update(&self, id: OrderId, mut update: OrderUpdate) -> Result<(), OrdersError> {
        if let Some(method) = update.payment_method.take() {
            let method = method.trim();
            if method.is_empty() {
                return Err(OrdersError::BlankPaymentMethod);
            }
            update.payment_method = Some(method.to_string());
        }
        if update.is_empty() {
            return Err(OrdersError::EmptyUpdate);
        }

        if !self.store.update_order(id, &update).await? {
            return Err(OrdersError::NotFound(id));
        }
        info!(order_id = %id, status = ?update.status, "Order updated");
        Ok(())
    }

    /// Delete an order; its items go with it.
    ///
    /// # Errors
    ///
    /// Returns an error if the order does not exist or the ledger write fails.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: OrderId) -> Result<(), OrdersError> {
        if !self.store.delete_order(id).await? {
            return Err(OrdersError::NotFound(id));
        }
        info!(order_id = %id, "Order deleted");
        Ok(())
    }
}
