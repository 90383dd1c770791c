//! Cart lines and the totals derived from them.
//!
//! A cart is a plain list of [`CartItem`]s keyed by book id. Totals are never
//! cached: [`total_items`] and [`total_price`] are recomputed from the list on
//! every read.

use serde::{Deserialize, Serialize};

use crate::catalog::Book;
use crate::types::{BookFormat, BookId, Money};

/// Largest quantity a single line may hold. Remote carts store quantities in
/// an `INTEGER` column, so lines never grow past `i32::MAX`.
pub const MAX_QUANTITY: u32 = i32::MAX.unsigned_abs();

/// A book in the cart together with the quantity wanted.
///
/// The book fields are a snapshot taken when the item was added (guest carts)
/// or joined from the current catalog row (remote carts).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    pub category: String,
    pub price: Money,
    pub cover_url: String,
    pub format: BookFormat,
    pub stock: Option<i32>,
    /// Always between 1 and [`MAX_QUANTITY`].
    pub quantity: u32,
}

impl CartItem {
    /// Snapshot a catalog book into a cart line.
    #[must_use]
    pub fn from_book(book: &Book, quantity: u32) -> Self {
        Self {
            book_id: book.id,
            title: book.title.clone(),
            author: book.author.clone(),
            category: book.category.clone(),
            price: book.price,
            cover_url: book.cover_url.clone(),
            format: book.format,
            stock: book.stock,
            quantity: quantity.clamp(1, MAX_QUANTITY),
        }
    }

    /// Price × quantity.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.price.times(self.quantity)
    }

    /// Whether this line needs physical delivery.
    #[must_use]
    pub const fn is_physical(&self) -> bool {
        matches!(self.format, BookFormat::Physical)
    }

    /// The persisted (book, quantity) pair for this line.
    #[must_use]
    pub const fn line(&self) -> CartLine {
        CartLine {
            book_id: self.book_id,
            quantity: self.quantity,
        }
    }
}

/// A (book, quantity) pair as stored in a remote cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub book_id: BookId,
    pub quantity: u32,
}

/// Sum of all quantities, saturating at `u32::MAX`.
#[must_use]
pub fn total_items(items: &[CartItem]) -> u32 {
    items
        .iter()
        .map(|item| item.quantity)
        .fold(0, u32::saturating_add)
}

/// Sum of price × quantity over all lines.
#[must_use]
pub fn total_price(items: &[CartItem]) -> Money {
    items.iter().map(CartItem::line_total).sum()
}

/// Whether any line needs physical delivery.
#[must_use]
pub fn has_physical_items(items: &[CartItem]) -> bool {
    items.iter().any(CartItem::is_physical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BookStatus;

    fn book(cents: i64, format: BookFormat) -> Book {
        Book {
            id: BookId::generate(),
            title: "Fé que move".to_string(),
            author: "Autor".to_string(),
            category: "Devocional".to_string(),
            description: String::new(),
            price: Money::from_cents(cents),
            old_price: None,
            cover_url: String::new(),
            status: BookStatus::Active,
            format,
            stock: None,
            isbn: String::new(),
            long_description: None,
            benefits: Vec::new(),
        }
    }

    #[test]
    fn test_from_book_clamps_quantity() {
        let item = CartItem::from_book(&book(2490, BookFormat::Digital), 0);
        assert_eq!(item.quantity, 1);
    }

    #[test]
    fn test_from_book_caps_quantity() {
        let item = CartItem::from_book(&book(2490, BookFormat::Digital), u32::MAX);
        assert_eq!(item.quantity, MAX_QUANTITY);
    }

    #[test]
    fn test_total_items_saturates() {
        let items: Vec<_> = (0..3)
            .map(|_| CartItem::from_book(&book(2490, BookFormat::Digital), MAX_QUANTITY))
            .collect();
        assert_eq!(total_items(&items), u32::MAX);
    }

    #[test]
    fn test_totals() {
        let items = vec![
            CartItem::from_book(&book(2490, BookFormat::Digital), 2),
            CartItem::from_book(&book(5990, BookFormat::Physical), 1),
        ];
        assert_eq!(total_items(&items), 3);
        assert_eq!(total_price(&items), Money::from_cents(10970));
        assert!(has_physical_items(&items));
    }

    #[test]
    fn test_empty_cart_totals() {
        assert_eq!(total_items(&[]), 0);
        assert_eq!(total_price(&[]), Money::ZERO);
        assert!(!has_physical_items(&[]));
    }
}
