//! Guest cart kept in the visitor's session.

use async_trait::async_trait;
use rhema_core::CartItem;
use tower_sessions::Session;

use super::cart::{CartError, GuestCartStorage};
use crate::models::session_keys;

/// Guest cart storage backed by the tower-sessions store.
#[derive(Clone)]
pub struct SessionGuestCart {
    session: Session,
}

impl SessionGuestCart {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }
}

fn storage_error(error: &tower_sessions::session::Error) -> CartError {
    CartError::Storage(error.to_string())
}

#[async_trait]
impl GuestCartStorage for SessionGuestCart {
    async fn load(&self) -> Result<Vec<CartItem>, CartError> {
        Ok(self
            .session
            .get::<Vec<CartItem>>(session_keys::GUEST_CART)
            .await
            .map_err(|e| storage_error(&e))?
            .unwrap_or_default())
    }

    async fn save(&self, items: &[CartItem]) -> Result<(), CartError> {
        self.session
            .insert(session_keys::GUEST_CART, items)
            .await
            .map_err(|e| storage_error(&e))
    }

    async fn clear(&self) -> Result<(), CartError> {
        self.session
            .remove::<Vec<CartItem>>(session_keys::GUEST_CART)
            .await
            .map_err(|e| storage_error(&e))?;
        Ok(())
    }
}
