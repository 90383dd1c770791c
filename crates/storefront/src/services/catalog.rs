//! Read access to the book catalog.

use async_trait::async_trait;
use rhema_core::{Book, BookId};

use crate::db::RepositoryError;

/// Source of catalog books.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// All books, newest first. With `listed_only`, inactive books are skipped.
    async fn list_books(&self, listed_only: bool) -> Result<Vec<Book>, RepositoryError>;

    /// A single book by id, whatever its status.
    async fn get_book(&self, id: BookId) -> Result<Option<Book>, RepositoryError>;

    /// A book that can currently be sold.
    async fn get_listed_book(&self, id: BookId) -> Result<Option<Book>, RepositoryError> {
        Ok(self
            .get_book(id)
            .await?
            .filter(|book| book.status.is_listed()))
    }
}
