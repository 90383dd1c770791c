//! Order ledger repository.
//!
//! Orders and their items are written in one transaction. Reads return the
//! items stitched back onto each order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rhema_core::rows::{OrderItemRow, OrderRow, assemble_orders};
use rhema_core::{NewOrder, Order, OrderId, UserId};
use sqlx::PgPool;

use super::{RepositoryError, quantity_column};
use crate::services::OrderLedger;

/// Repository for the order ledger.
#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn items_for(&self, ids: &[OrderId]) -> Result<Vec<OrderItemRow>, RepositoryError> {
        let ids: Vec<uuid::Uuid> = ids.iter().map(OrderId::as_uuid).collect();
        let rows = sqlx::query_as(
            r#"
            SELECT order_id, book_id, title, quantity, price
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

fn map_insert_error(error: sqlx::Error) -> RepositoryError {
    match &error {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepositoryError::Conflict(db.message().to_string())
        }
        _ => RepositoryError::Database(error),
    }
}

#[async_trait]
impl OrderLedger for OrderRepository {
    async fn create_order(&self, order: &NewOrder) -> Result<DateTime<Utc>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let created_at: DateTime<Utc> = sqlx::query_scalar(
            r#"
            INSERT INTO orders (
                id, user_id, customer_name, customer_email, customer_phone,
                address, city, zip, payment_method, status, amount,
                shipping_cost, shipping_method
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING created_at
            "#,
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(&order.customer_name)
        .bind(&order.customer_email)
        .bind(&order.customer_phone)
        .bind(&order.address)
        .bind(&order.city)
        .bind(&order.zip)
        .bind(&order.payment_method)
        .bind(order.status.as_str())
        .bind(order.amount)
        .bind(order.shipping_cost)
        .bind(order.shipping_method.as_deref())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_insert_error)?;

        for item in &order.items {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, book_id, title, quantity, price)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order.id)
            .bind(item.book_id)
            .bind(&item.title)
            .bind(quantity_column(item.quantity)?)
            .bind(item.price)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(created_at)
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let orders: Vec<OrderRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, customer_name, customer_email, customer_phone,
                   address, city, zip, payment_method, status, amount,
                   shipping_cost, shipping_method, created_at
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
        let items = self.items_for(&ids).await?;
        Ok(assemble_orders(orders, items)?)
    }
}
