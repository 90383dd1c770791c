//! Back-office services.
//!
//! Storage sits behind `async-trait` seams so the services and routes can
//! be exercised with in-memory fakes.

pub mod auth;
pub mod catalog;
pub mod dashboard;
pub mod orders;
pub mod settings;

#[cfg(test)]
pub(crate) mod fakes;

pub use auth::{AuthError, BackendAuthClient, RoleLookup, TokenVerifier, VerifiedUser};
pub use catalog::BookCatalog;
pub use dashboard::{BookPerformance, Dashboard, summarize};
pub use orders::{
    OrderAdmin, OrderListing, OrderService, OrderStats, OrdersError, StatusFilter, export_csv,
};
pub use settings::{SettingsError, SettingsService, SettingsStore};
