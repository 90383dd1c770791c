//! Catalog reads.

use async_trait::async_trait;
use rhema_core::Book;
use rhema_core::rows::BookRow;
use sqlx::PgPool;

use super::RepositoryError;
use crate::services::BookCatalog;

#[derive(Clone)]
pub struct BookRepository {
    pool: PgPool,
}

impl BookRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookCatalog for BookRepository {
    async fn list_books(&self) -> Result<Vec<Book>, RepositoryError> {
        let rows: Vec<BookRow> = sqlx::query_as(
            r#"
            SELECT id, title, author, category, description, price, old_price,
                   cover_url, status, format, stock, isbn, long_description, benefits
            FROM books
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| Book::try_from(row).map_err(RepositoryError::from))
            .collect()
    }
}
