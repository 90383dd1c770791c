//! Catalog reads for the dashboard.

use async_trait::async_trait;
use rhema_core::Book;

use crate::db::RepositoryError;

/// All catalog books, whatever their status.
#[async_trait]
pub trait BookCatalog: Send + Sync {
    /// Newest first.
    async fn list_books(&self) -> Result<Vec<Book>, RepositoryError>;
}
