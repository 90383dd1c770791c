//! Remote cart repository.
//!
//! One cart per user. Lines are unique per `(cart_id, book_id)`, so every
//! write is an upsert that overwrites the stored quantity.

use async_trait::async_trait;
use rhema_core::rows::CartItemRow;
use rhema_core::{BookId, CartId, CartItem, CartLine, UserId};
use sqlx::{PgPool, Postgres, Transaction};

use super::{RepositoryError, quantity_column};
use crate::services::CartPersistence;

/// Repository for customer carts.
#[derive(Clone)]
pub struct CartRepository {
    pool: PgPool,
}

impl CartRepository {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn upsert_in(
        tx: &mut Transaction<'_, Postgres>,
        cart_id: CartId,
        line: CartLine,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO cart_items (cart_id, book_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (cart_id, book_id) DO UPDATE SET quantity = EXCLUDED.quantity
            "#,
        )
        .bind(cart_id)
        .bind(line.book_id)
        .bind(quantity_column(line.quantity)?)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl CartPersistence for CartRepository {
    async fn get_or_create_cart(&self, user_id: UserId) -> Result<CartId, RepositoryError> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let id: CartId = sqlx::query_scalar(
            r#"
            INSERT INTO carts (id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING id
            "#,
        )
        .bind(CartId::generate())
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn list_items(&self, cart_id: CartId) -> Result<Vec<CartItem>, RepositoryError> {
        let rows: Vec<CartItemRow> = sqlx::query_as(
            r#"
            SELECT b.id AS book_id, b.title, b.author, b.category, b.price,
                   b.cover_url, b.format, b.stock, ci.quantity
            FROM cart_items ci
            JOIN books b ON b.id = ci.book_id
            WHERE ci.cart_id = $1
            ORDER BY ci.created_at, b.title
            "#,
        )
        .bind(cart_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| CartItem::try_from(row).map_err(RepositoryError::from))
            .collect()
    }

    async fn upsert_item(&self, cart_id: CartId, line: CartLine) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        Self::upsert_in(&mut tx, cart_id, line).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn upsert_items(
        &self,
        cart_id: CartId,
        lines: &[CartLine],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        for line in lines {
            Self::upsert_in(&mut tx, cart_id, *line).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn delete_item(&self, cart_id: CartId, book_id: BookId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND book_id = $2")
            .bind(cart_id)
            .bind(book_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear_cart(&self, cart_id: CartId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
