//! Business logic services for storefront.
//!
//! # Services
//!
//! - `cart` - Guest and customer carts, login merge
//! - `address` - Postal code lookup
//! - `shipping` - Shipping quotes
//! - `checkout` - Checkout steps and order submission
//! - `payment` - Hosted payment preferences
//! - `notify` - Order webhook queue
//! - `settings` - Cached application settings
//! - `auth` - Access token verification
//!
//! External systems are reached through the traits defined here so handlers
//! and tests can swap them.

pub mod address;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod notify;
pub mod orders;
pub mod payment;
pub mod session_cart;
pub mod settings;
pub mod shipping;

#[cfg(test)]
pub(crate) mod fakes;

pub use address::{AddressLookup, AddressResolver, Resolution, ViaCepClient};
pub use auth::{AuthError, BackendAuthClient, TokenVerifier, VerifiedUser};
pub use cart::{CartError, CartOwner, CartPersistence, CartSnapshot, CartStore, GuestCartStorage};
pub use catalog::Catalog;
pub use checkout::{Checkout, CheckoutError, CheckoutSource, CheckoutState, CheckoutStep};
pub use notify::{HttpWebhookSink, OrderNotifier};
pub use orders::OrderLedger;
pub use payment::{MercadoPagoClient, PaymentError, PaymentGateway};
pub use session_cart::SessionGuestCart;
pub use settings::{SettingsCache, SettingsStore};
pub use shipping::{ShippingQuoter, TableRateProvider};
