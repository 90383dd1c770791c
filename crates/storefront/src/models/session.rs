//! Session-related types.
//!
//! Types stored in the session for authentication, cart and checkout state.

use serde::{Deserialize, Serialize};

use rhema_core::UserId;

/// Session-stored user identity.
///
/// Set after the backend confirms the visitor's access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Backend user id.
    pub id: UserId,
    /// User's email address.
    pub email: String,
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the guest cart items.
    pub const GUEST_CART: &str = "guest_cart";

    /// Key for the in-progress checkout.
    pub const CHECKOUT: &str = "checkout";
}
