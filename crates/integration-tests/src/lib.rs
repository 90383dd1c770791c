//! Database-backed integration tests for the Rhema bookstore.
//!
//! # Running Tests
//!
//! ```bash
//! # Point at a disposable database
//! export TEST_DATABASE_URL=postgres://localhost/rhema_test
//!
//! # Run the ignored tests
//! cargo test -p rhema-integration-tests -- --ignored
//! ```
//!
//! Migrations are applied on connect. Tests generate fresh ids so they can
//! share one database.

use rhema_core::{BookFormat, BookId, Money};
use sqlx::PgPool;

/// Connect to `TEST_DATABASE_URL` and apply migrations.
///
/// # Panics
///
/// Panics if the variable is unset or the database is unreachable.
#[allow(clippy::expect_used)]
pub async fn test_pool() -> PgPool {
    let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
    let pool = PgPool::connect(&url)
        .await
        .expect("Failed to connect to test database");
    sqlx::migrate!("../storefront/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

/// Insert an active catalog book.
///
/// # Panics
///
/// Panics if the insert fails.
#[allow(clippy::expect_used)]
pub async fn insert_book(pool: &PgPool, title: &str, price: Money, format: BookFormat) -> BookId {
    sqlx::query_scalar(
        r#"
        INSERT INTO books (title, price, format)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(title)
    .bind(price)
    .bind(format.as_str())
    .fetch_one(pool)
    .await
    .expect("Failed to insert book")
}
