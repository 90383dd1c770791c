//! Cart Store.
//!
//! A cart is either a guest cart, kept in the visitor's session, or a remote
//! cart keyed by user id. The first load after sign-in merges the guest cart
//! into the remote one and then empties the guest cart.
//!
//! Mutations are applied to the in-memory list first and then written to the
//! backing store. For guest carts a storage failure is an error. For remote
//! carts a failed write is logged and recorded in
//! [`CartSnapshot::sync_pending`]; the local list is kept as-is. Two racing
//! requests may therefore leave the remote cart with the result of whichever
//! write finished last.

use std::sync::Arc;

use async_trait::async_trait;
use rhema_core::{
    Book, BookId, CartId, CartItem, CartLine, MAX_QUANTITY, Money, UserId, has_physical_items,
    total_items, total_price,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{instrument, warn};

use crate::db::RepositoryError;

/// Errors surfaced by the cart store.
#[derive(Debug, Error)]
pub enum CartError {
    /// The guest cart could not be read or written.
    #[error("guest cart storage failed: {0}")]
    Storage(String),

    /// The remote cart could not be loaded or merged.
    #[error("remote cart error: {0}")]
    Remote(#[from] RepositoryError),
}

/// Server-side persistence of customer carts.
#[async_trait]
pub trait CartPersistence: Send + Sync {
    /// Fetch the cart of `user_id`, creating it on first use.
    async fn get_or_create_cart(&self, user_id: UserId) -> Result<CartId, RepositoryError>;

    /// Items of a cart joined with the current catalog data.
    async fn list_items(&self, cart_id: CartId) -> Result<Vec<CartItem>, RepositoryError>;

    /// Insert or overwrite the quantity of one book.
    async fn upsert_item(&self, cart_id: CartId, line: CartLine) -> Result<(), RepositoryError>;

    /// Insert or overwrite several books at once. All or nothing.
    async fn upsert_items(&self, cart_id: CartId, lines: &[CartLine])
    -> Result<(), RepositoryError>;

    async fn delete_item(&self, cart_id: CartId, book_id: BookId) -> Result<(), RepositoryError>;

    async fn clear_cart(&self, cart_id: CartId) -> Result<(), RepositoryError>;
}

/// Client-side storage of the guest cart.
#[async_trait]
pub trait GuestCartStorage: Send + Sync {
    /// The stored cart, or an empty list.
    async fn load(&self) -> Result<Vec<CartItem>, CartError>;

    async fn save(&self, items: &[CartItem]) -> Result<(), CartError>;

    async fn clear(&self) -> Result<(), CartError>;
}

/// Whose cart is being worked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartOwner {
    Guest,
    Customer(UserId),
}

impl From<Option<UserId>> for CartOwner {
    fn from(user: Option<UserId>) -> Self {
        user.map_or(Self::Guest, Self::Customer)
    }
}

#[derive(Debug, Clone, Copy)]
enum Backing {
    Guest,
    Remote(CartId),
}

/// The cart as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct CartSnapshot {
    pub items: Vec<CartItem>,
    pub total_items: u32,
    pub total_price: Money,
    pub has_physical_items: bool,
    /// A remote write failed during this request; the server copy may be stale.
    pub sync_pending: bool,
}

/// A loaded cart and the stores behind it.
pub struct CartStore {
    remote: Arc<dyn CartPersistence>,
    guest: Arc<dyn GuestCartStorage>,
    backing: Backing,
    items: Vec<CartItem>,
    sync_pending: bool,
}

impl CartStore {
    /// Load the cart for `owner`.
    ///
    /// For a customer this fetches (or creates) the remote cart, merges any
    /// guest items into it (the guest quantity wins on conflict), clears the
    /// guest cart and then reads the merged result. If the merge fails the
    /// guest cart is left untouched and the error is returned.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if either store cannot be read or the merge fails.
    #[instrument(skip(remote, guest))]
    pub async fn load(
        remote: Arc<dyn CartPersistence>,
        guest: Arc<dyn GuestCartStorage>,
        owner: CartOwner,
    ) -> Result<Self, CartError> {
        let (backing, items) = match owner {
            CartOwner::Guest => (Backing::Guest, guest.load().await?),
            CartOwner::Customer(user_id) => {
                let cart_id = remote.get_or_create_cart(user_id).await?;
                let guest_items = guest.load().await?;
                if !guest_items.is_empty() {
                    let lines: Vec<CartLine> = guest_items.iter().map(CartItem::line).collect();
                    remote.upsert_items(cart_id, &lines).await?;
                    guest.clear().await?;
                    tracing::info!(%cart_id, merged = lines.len(), "Merged guest cart");
                }
                (Backing::Remote(cart_id), remote.list_items(cart_id).await?)
            }
        };

        Ok(Self {
            remote,
            guest,
            backing,
            items,
            sync_pending: false,
        })
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn total_items(&self) -> u32 {
        total_items(&self.items)
    }

    #[must_use]
    pub fn total_price(&self) -> Money {
        total_price(&self.items)
    }

    /// Whether a remote write failed since the cart was loaded.
    #[must_use]
    pub const fn sync_pending(&self) -> bool {
        self.sync_pending
    }

    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot {
            items: self.items.clone(),
            total_items: self.total_items(),
            total_price: self.total_price(),
            has_physical_items: has_physical_items(&self.items),
            sync_pending: self.sync_pending,
        }
    }

    /// Add one unit of `book`.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if a guest cart cannot be saved.
    #[instrument(skip(self, book), fields(book_id = %book.id))]
    pub async fn add(&mut self, book: &Book) -> Result<(), CartError> {
        let quantity = match self.items.iter_mut().find(|item| item.book_id == book.id) {
            Some(item) => {
                item.quantity = item.quantity.saturating_add(1).min(MAX_QUANTITY);
                item.quantity
            }
            None => {
                self.items.push(CartItem::from_book(book, 1));
                1
            }
        };
        self.persist_line(CartLine {
            book_id: book.id,
            quantity,
        })
        .await
    }

    /// Change a quantity by `delta`, never going below 1.
    ///
    /// Books not in the cart are ignored.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if a guest cart cannot be saved.
    #[instrument(skip(self))]
    pub async fn update_quantity(&mut self, book_id: BookId, delta: i64) -> Result<(), CartError> {
        let Some(item) = self.items.iter_mut().find(|item| item.book_id == book_id) else {
            return Ok(());
        };
        item.quantity = adjusted_quantity(item.quantity, delta);
        let line = item.line();
        self.persist_line(line).await
    }

    /// Remove a book from the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if a guest cart cannot be saved.
    #[instrument(skip(self))]
    pub async fn remove(&mut self, book_id: BookId) -> Result<(), CartError> {
        self.items.retain(|item| item.book_id != book_id);
        match self.backing {
            Backing::Guest => self.guest.save(&self.items).await,
            Backing::Remote(cart_id) => {
                let result = self.remote.delete_item(cart_id, book_id).await;
                self.record_remote(result, "delete cart item");
                Ok(())
            }
        }
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if a guest cart cannot be cleared.
    #[instrument(skip(self))]
    pub async fn clear(&mut self) -> Result<(), CartError> {
        self.items.clear();
        match self.backing {
            Backing::Guest => self.guest.clear().await,
            Backing::Remote(cart_id) => {
                let result = self.remote.clear_cart(cart_id).await;
                self.record_remote(result, "clear cart");
                Ok(())
            }
        }
    }

    async fn persist_line(&mut self, line: CartLine) -> Result<(), CartError> {
        match self.backing {
            Backing::Guest => self.guest.save(&self.items).await,
            Backing::Remote(cart_id) => {
                let result = self.remote.upsert_item(cart_id, line).await;
                self.record_remote(result, "upsert cart item");
                Ok(())
            }
        }
    }

    fn record_remote(&mut self, result: Result<(), RepositoryError>, operation: &'static str) {
        if let Err(error) = result {
            warn!(error = %error, operation, "Remote cart write failed, keeping local state");
            self.sync_pending = true;
        }
    }
}

/// `quantity + delta` clamped to `1..=MAX_QUANTITY`.
#[must_use]
pub fn adjusted_quantity(quantity: u32, delta: i64) -> u32 {
    let next = i64::from(quantity)
        .saturating_add(delta)
        .clamp(1, i64::from(MAX_QUANTITY));
    u32::try_from(next).unwrap_or(MAX_QUANTITY)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::fakes::{InMemoryCarts, MemoryGuestCart, book};
    use rhema_core::BookFormat;

    async fn guest_store(guest: &Arc<MemoryGuestCart>) -> CartStore {
        CartStore::load(
            Arc::new(InMemoryCarts::default()),
            guest.clone(),
            CartOwner::Guest,
        )
        .await
        .unwrap()
    }

    #[test]
    fn test_adjusted_quantity_never_below_one() {
        assert_eq!(adjusted_quantity(3, -100), 1);
        assert_eq!(adjusted_quantity(3, -2), 1);
        assert_eq!(adjusted_quantity(3, -3), 1);
        assert_eq!(adjusted_quantity(3, 2), 5);
        assert_eq!(adjusted_quantity(MAX_QUANTITY, 1), MAX_QUANTITY);
        assert_eq!(adjusted_quantity(3, i64::MAX), MAX_QUANTITY);
        assert_eq!(adjusted_quantity(1, i64::MIN), 1);
    }

    #[tokio::test]
    async fn test_guest_totals_follow_every_mutation() {
        let guest = Arc::new(MemoryGuestCart::default());
        let mut store = guest_store(&guest).await;
        let ebook = book("Ebook X", 2490, BookFormat::Digital);
        let printed = book("Livro Y", 5990, BookFormat::Physical);

        store.add(&ebook).await.unwrap();
        store.add(&ebook).await.unwrap();
        store.add(&printed).await.unwrap();
        assert_eq!(store.total_items(), 3);
        assert_eq!(store.total_price(), Money::from_cents(10970));

        store.update_quantity(ebook.id, 3).await.unwrap();
        assert_eq!(store.total_items(), 6);
        assert_eq!(store.total_price(), Money::from_cents(2490 * 5 + 5990));

        store.update_quantity(ebook.id, -100).await.unwrap();
        assert_eq!(store.items()[0].quantity, 1);

        store.remove(printed.id).await.unwrap();
        assert_eq!(store.total_items(), 1);
        assert_eq!(store.total_price(), Money::from_cents(2490));

        // Every change is written back to the guest storage.
        assert_eq!(guest.items().len(), 1);
        assert_eq!(guest.items()[0].quantity, 1);

        store.clear().await.unwrap();
        assert_eq!(store.total_items(), 0);
        assert!(guest.items().is_empty());
    }

    #[tokio::test]
    async fn test_huge_delta_caps_quantity_and_totals_stay_exact() {
        let guest = Arc::new(MemoryGuestCart::default());
        let mut store = guest_store(&guest).await;
        let first = book("Ebook X", 2490, BookFormat::Digital);
        let second = book("Livro Y", 5990, BookFormat::Physical);

        store.add(&first).await.unwrap();
        store.update_quantity(first.id, i64::MAX).await.unwrap();
        store.add(&first).await.unwrap();
        store.add(&second).await.unwrap();

        assert_eq!(store.items()[0].quantity, MAX_QUANTITY);
        assert_eq!(store.total_items(), MAX_QUANTITY + 1);
    }

    #[tokio::test]
    async fn test_update_quantity_ignores_unknown_book() {
        let guest = Arc::new(MemoryGuestCart::default());
        let mut store = guest_store(&guest).await;
        store.update_quantity(BookId::generate(), 5).await.unwrap();
        assert!(store.items().is_empty());
    }

    #[tokio::test]
    async fn test_login_merge_overwrites_remote_with_guest_quantities() {
        let a = book("A", 1000, BookFormat::Physical);
        let b = book("B", 2000, BookFormat::Digital);
        let user = UserId::generate();

        let remote = Arc::new(InMemoryCarts::with_books([a.clone(), b.clone()]));
        let cart_id = remote.get_or_create_cart(user).await.unwrap();
        remote
            .upsert_item(
                cart_id,
                CartLine {
                    book_id: b.id,
                    quantity: 5,
                },
            )
            .await
            .unwrap();

        let guest = Arc::new(MemoryGuestCart::with_items(vec![
            CartItem::from_book(&a, 2),
            CartItem::from_book(&b, 1),
        ]));

        let store = CartStore::load(remote.clone(), guest.clone(), CartOwner::Customer(user))
            .await
            .unwrap();

        let quantity_of = |id: BookId| {
            store
                .items()
                .iter()
                .find(|item| item.book_id == id)
                .map(|item| item.quantity)
        };
        assert_eq!(store.items().len(), 2);
        assert_eq!(quantity_of(a.id), Some(2));
        assert_eq!(quantity_of(b.id), Some(1));
        assert!(guest.items().is_empty());
    }

    #[tokio::test]
    async fn test_failed_merge_leaves_guest_cart_untouched() {
        let a = book("A", 1000, BookFormat::Physical);
        let remote = Arc::new(InMemoryCarts::with_books([a.clone()]));
        remote.fail_writes(true);
        let guest = Arc::new(MemoryGuestCart::with_items(vec![CartItem::from_book(&a, 2)]));

        let result =
            CartStore::load(remote, guest.clone(), CartOwner::Customer(UserId::generate())).await;

        assert!(matches!(result, Err(CartError::Remote(_))));
        assert_eq!(guest.items().len(), 1);
        assert_eq!(guest.items()[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_remote_write_failure_keeps_local_state_and_flags_sync() {
        let a = book("A", 1000, BookFormat::Physical);
        let remote = Arc::new(InMemoryCarts::with_books([a.clone()]));
        let guest = Arc::new(MemoryGuestCart::default());
        let mut store =
            CartStore::load(remote.clone(), guest, CartOwner::Customer(UserId::generate()))
                .await
                .unwrap();

        remote.fail_writes(true);
        store.add(&a).await.unwrap();

        assert_eq!(store.total_items(), 1);
        assert!(store.sync_pending());
        assert!(store.snapshot().sync_pending);
    }

    #[tokio::test]
    async fn test_customer_mutations_reach_remote_store() {
        let a = book("A", 1000, BookFormat::Physical);
        let user = UserId::generate();
        let remote = Arc::new(InMemoryCarts::with_books([a.clone()]));
        let guest = Arc::new(MemoryGuestCart::default());
        let mut store = CartStore::load(remote.clone(), guest.clone(), CartOwner::Customer(user))
            .await
            .unwrap();

        store.add(&a).await.unwrap();
        store.update_quantity(a.id, 2).await.unwrap();

        let cart_id = remote.get_or_create_cart(user).await.unwrap();
        let items = remote.list_items(cart_id).await.unwrap();
        assert_eq!(items[0].quantity, 3);
        assert!(!store.sync_pending());
        // Authenticated carts never write to the guest storage.
        assert!(guest.items().is_empty());

        store.clear().await.unwrap();
        assert!(remote.list_items(cart_id).await.unwrap().is_empty());
    }
}
