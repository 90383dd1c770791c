//! Database operations for the back office.
//!
//! The back office shares the storefront database:
//!
//! - `orders` / `order_items` - Order ledger (read, update, delete)
//! - `books` - Catalog (read for the dashboard)
//! - `profiles` - User roles (read for staff checks)
//! - `app_settings` - Key-value settings (read and write)
//!
//! Migrations live in `crates/storefront/migrations/` and run via
//! `cargo run -p rhema-cli -- migrate`.

pub mod books;
pub mod orders;
pub mod profiles;
pub mod settings;

use std::time::Duration;

use rhema_core::rows::RowError;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub use books::BookRepository;
pub use orders::OrderRepository;
pub use profiles::ProfileRepository;
pub use settings::SettingsRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

impl From<RowError> for RepositoryError {
    fn from(err: RowError) -> Self {
        Self::DataCorruption(err.to_string())
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
