//! Catalog books.

use serde::{Deserialize, Serialize};

use crate::types::{BookFormat, BookId, BookStatus, Money};

/// A book in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub category: String,
    pub description: String,
    pub price: Money,
    /// Previous price shown struck through, if the book is discounted.
    pub old_price: Option<Money>,
    pub cover_url: String,
    pub status: BookStatus,
    pub format: BookFormat,
    /// Units on hand for physical books. `None` means untracked.
    pub stock: Option<i32>,
    pub isbn: String,
    pub long_description: Option<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
}

impl Book {
    /// Whether the book has to be shipped.
    #[must_use]
    pub const fn is_physical(&self) -> bool {
        matches!(self.format, BookFormat::Physical)
    }
}
