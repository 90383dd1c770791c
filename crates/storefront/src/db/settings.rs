//! Settings repository (read side).

use async_trait::async_trait;
use sqlx::PgPool;

use super::RepositoryError;
use crate::services::SettingsStore;

/// Reads the `app_settings` key-value table.
#[derive(Clone)]
pub struct SettingsRepository {
    pool: PgPool,
}

impl SettingsRepository {
    /// Create a new settings repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsStore for SettingsRepository {
    async fn load_pairs(&self) -> Result<Vec<(String, String)>, RepositoryError> {
        let pairs = sqlx::query_as("SELECT key, value FROM app_settings")
            .fetch_all(&self.pool)
            .await?;
        Ok(pairs)
    }
}
