//! Order ledger collaborator as seen from the storefront.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rhema_core::{NewOrder, Order, UserId};

use crate::db::RepositoryError;

/// Create-and-read access to the order ledger.
#[async_trait]
pub trait OrderLedger: Send + Sync {
    /// Write an order and all its items atomically. Returns the stored timestamp.
    async fn create_order(&self, order: &NewOrder) -> Result<DateTime<Utc>, RepositoryError>;

    /// Orders owned by `user_id`, newest first.
    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError>;
}
