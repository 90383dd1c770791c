//! Order ledger repository (back-office side).

use async_trait::async_trait;
use rhema_core::rows::{OrderItemRow, OrderRow, assemble_orders};
use rhema_core::{Order, OrderId, OrderUpdate};
use sqlx::PgPool;

use super::RepositoryError;
use crate::services::OrderAdmin;

/// Repository for listing and editing orders.
#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderAdmin for OrderRepository {
    async fn list_orders(&self) -> Result<Vec<Order>, RepositoryError> {
        let orders: Vec<OrderRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, customer_name, customer_email, customer_phone,
                   address, city, zip, payment_method, status, amount,
                   shipping_cost, shipping_method, created_at
            FROM orders
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let items: Vec<OrderItemRow> = sqlx::query_as(
            r#"
            SELECT order_id, book_id, title, quantity, price
            FROM order_items
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(assemble_orders(orders, items)?)
    }

    async fn update_order(
        &self,
        id: OrderId,
        update: &OrderUpdate,
    ) -> Result<bool, RepositoryError> {
        // NULL parameters leave the column as it is.
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = COALESCE($2, status),
                payment_method = COALESCE($3, payment_method)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(update.status.map(|s| s.as_str()))
        .bind(update.payment_method.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_order(&self, id: OrderId) -> Result<bool, RepositoryError> {
        // order_items rows go with it (ON DELETE CASCADE).
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
