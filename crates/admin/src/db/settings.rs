//! Settings repository.

use async_trait::async_trait;
use sqlx::PgPool;

use super::RepositoryError;
use crate::services::SettingsStore;

/// Reads and writes the `app_settings` key-value table.
#[derive(Clone)]
pub struct SettingsRepository {
    pool: PgPool,
}

impl SettingsRepository {
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

    async fn upsert_pairs(&self, pairs: &[(&'static str, String)]) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        for (key, value) in pairs {
            sqlx::query(
                r#"
                INSERT INTO app_settings (key, value)
                VALUES ($1, $2)
                ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
                "#,
            )
            .bind(*key)
            .bind(value.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
