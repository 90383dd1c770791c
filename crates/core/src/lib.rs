//! Rhema Core - Shared domain types for the bookstore.
//!
//! This crate provides the types used across all Rhema components:
//! - `storefront` - Public catalog, cart and checkout
//! - `admin` - Back office for orders, dashboard and settings
//! - `cli` - Command-line tools for migrations and role grants
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP clients. Database row mappings are compiled in
//! with the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Typed ids, money and status enums
//! - [`catalog`] - Books
//! - [`cart`] - Cart lines and totals
//! - [`address`] - Postal codes and delivery addresses
//! - [`shipping`] - Shipping options
//! - [`order`] - Orders (sales) and their line items
//! - [`settings`] - Process-wide application settings

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod address;
pub mod cart;
pub mod catalog;
pub mod order;
#[cfg(feature = "postgres")]
pub mod rows;
pub mod settings;
pub mod shipping;
pub mod types;

pub use address::{Address, PostalCode, PostalCodeError, ResolvedAddress, format_postal_code_input};
pub use cart::{
    CartItem, CartLine, MAX_QUANTITY, has_physical_items, total_items, total_price,
};
pub use catalog::Book;
pub use order::{NewOrder, Order, OrderItem, OrderUpdate};
pub use settings::{AppSettings, AppSettingsPatch};
pub use shipping::{ShippingOption, ShippingOptionId};
pub use types::*;
