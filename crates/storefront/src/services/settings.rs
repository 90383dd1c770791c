//! Cached application settings.
//!
//! Settings are read from the key-value table through a `moka` cache with a
//! short TTL, so changes made in the back office show up without a restart.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use rhema_core::AppSettings;
use thiserror::Error;

use crate::db::RepositoryError;

/// Settings could not be loaded.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings unavailable: {0}")]
    Unavailable(#[from] Arc<RepositoryError>),
}

/// Key-value settings storage.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Every stored `(key, value)` pair.
    async fn load_pairs(&self) -> Result<Vec<(String, String)>, RepositoryError>;
}

/// Read-through cache in front of a [`SettingsStore`].
#[derive(Clone)]
pub struct SettingsCache {
    store: Arc<dyn SettingsStore>,
    cache: Cache<(), AppSettings>,
}

impl SettingsCache {
    #[must_use]
    pub fn new(store: Arc<dyn SettingsStore>, ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(1).time_to_live(ttl).build();
        Self { store, cache }
    }

    /// Current settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if the cache is cold and the store fails.
    pub async fn get(&self) -> Result<AppSettings, SettingsError> {
        let store = Arc::clone(&self.store);
        let settings = self
            .cache
            .try_get_with((), async move {
                let pairs = store.load_pairs().await?;
                Ok::<_, RepositoryError>(AppSettings::from_pairs(pairs))
            })
            .await?;
        Ok(settings)
    }
}
