//! Book repository (read-only catalog access).

use async_trait::async_trait;
use rhema_core::rows::BookRow;
use rhema_core::{Book, BookId};
use sqlx::PgPool;

use super::RepositoryError;
use crate::services::Catalog;

/// Repository for catalog queries.
#[derive(Clone)]
pub struct BookRepository {
    pool: PgPool,
}

impl BookRepository {
    /// Create a new book repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Catalog for BookRepository {
    async fn list_books(&self, listed_only: bool) -> Result<Vec<Book>, RepositoryError> {
        let rows: Vec<BookRow> = sqlx::query_as(
            r#"
            SELECT id, title, author, category, description, price, old_price,
                   cover_url, status, format, stock, isbn, long_description, benefits
            FROM books
            WHERE NOT $1 OR status IN ('active', 'launch')
            ORDER BY created_at DESC
            "#,
        )
        .bind(listed_only)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| Book::try_from(row).map_err(RepositoryError::from))
            .collect()
    }

    async fn get_book(&self, id: BookId) -> Result<Option<Book>, RepositoryError> {
        let row: Option<BookRow> = sqlx::query_as(
            r#"
            SELECT id, title, author, category, description, price, old_price,
                   cover_url, status, format, stock, isbn, long_description, benefits
            FROM books
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Book::try_from).transpose().map_err(Into::into)
    }
}
