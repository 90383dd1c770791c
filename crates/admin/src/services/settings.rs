//! Settings reads and partial updates.
//!
//! The back office writes straight to the `app_settings` table. The
//! storefront caches reads for a short while, so changes show up there
//! after its cache expires.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use rhema_core::{AppSettings, AppSettingsPatch, BookId};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, instrument};

use crate::db::RepositoryError;

#[derive(Debug, Error)]
pub enum SettingsError {
    /// A field of the patch does not parse.
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("nothing to update")]
    EmptyPatch,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Key-value settings storage.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load_pairs(&self) -> Result<Vec<(String, String)>, RepositoryError>;

    /// Insert or overwrite the given keys in one transaction.
    async fn upsert_pairs(&self, pairs: &[(&'static str, String)]) -> Result<(), RepositoryError>;
}

fn invalid(field: &'static str, reason: impl Into<String>) -> SettingsError {
    SettingsError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Reject values the typed settings would silently drop.
///
/// Empty strings are accepted: they clear the optional settings.
fn validate(patch: &AppSettingsPatch) -> Result<(), SettingsError> {
    if let Some(id) = patch.launch_book_id.as_deref().map(str::trim)
        && !id.is_empty()
    {
        BookId::from_str(id).map_err(|e| invalid("launch_book_id", e.to_string()))?;
    }

    if let Some(price) = patch.launch_price.as_deref().map(str::trim)
        && !price.is_empty()
    {
        let price = Decimal::from_str(price).map_err(|e| invalid("launch_price", e.to_string()))?;
        if price.is_sign_negative() {
            return Err(invalid("launch_price", "must not be negative"));
        }
    }

    if let Some(email) = patch.support_email.as_deref().map(str::trim)
        && !email.is_empty()
        && !email.contains('@')
    {
        return Err(invalid("support_email", "not an email address"));
    }

    if let Some(url) = patch.sheets_webhook_url.as_deref().map(str::trim)
        && !url.is_empty()
        && !(url.starts_with("https://") || url.starts_with("http://"))
    {
        return Err(invalid("sheets_webhook_url", "must be an http(s) URL"));
    }

    Ok(())
}

/// Typed access to the settings table.
#[derive(Clone)]
pub struct SettingsService {
    store: Arc<dyn SettingsStore>,
}

impl SettingsService {
    #[must_use]
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    /// Current settings, defaults filled in.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    pub async fn load(&self) -> Result<AppSettings, SettingsError> {
        Ok(AppSettings::from_pairs(self.store.load_pairs().await?))
    }

    /// Write the provided fields and return the resulting settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the patch is empty or malformed, or the write
    /// fails.
    #[instrument(skip(self, patch))]
    pub async fn update(&self, patch: &AppSettingsPatch) -> Result<AppSettings, SettingsError> {
        validate(patch)?;
        let pairs = patch.to_pairs();
        if pairs.is_empty() {
            return Err(SettingsError::EmptyPatch);
        }

        self.store.upsert_pairs(&pairs).await?;
        info!(
            keys = ?pairs.iter().map(|(key, _)| *key).collect::<Vec<_>>(),
            "Settings updated"
        );
        self.load().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rhema_core::Money;
    use rhema_core::settings::{DEFAULT_SUPPORT_EMAIL, KEY_PRE_LAUNCH};

    use super::*;
    use crate::services::fakes::InMemorySettings;

    #[tokio::test]
    async fn test_partial_update_keeps_other_keys() {
        let store = Arc::new(InMemorySettings::with_pairs([(KEY_PRE_LAUNCH, "true")]));
        let service = SettingsService::new(store);

        let settings = service
            .update(&AppSettingsPatch {
                launch_price: Some("39.90".to_string()),
                ..AppSettingsPatch::default()
            })
            .await
            .unwrap();

        assert!(settings.is_pre_launch);
        assert_eq!(settings.launch_price, Some(Money::from_cents(3990)));
        assert_eq!(settings.support_email, DEFAULT_SUPPORT_EMAIL);
    }

    #[tokio::test]
    async fn test_empty_string_clears_launch_book() {
        let id = BookId::generate();
        let store = Arc::new(InMemorySettings::default());
        let service = SettingsService::new(store);

        let set = AppSettingsPatch {
            launch_book_id: Some(id.to_string()),
            ..AppSettingsPatch::default()
        };
        assert_eq!(
            service.update(&set).await.unwrap().launch_book_id,
            Some(id)
        );

        let clear = AppSettingsPatch {
            launch_book_id: Some(String::new()),
            ..AppSettingsPatch::default()
        };
        assert_eq!(service.update(&clear).await.unwrap().launch_book_id, None);
    }

    #[tokio::test]
    async fn test_malformed_values_are_rejected() {
        let service = SettingsService::new(Arc::new(InMemorySettings::default()));

        for patch in [
            AppSettingsPatch {
                launch_book_id: Some("book-1".to_string()),
                ..AppSettingsPatch::default()
            },
            AppSettingsPatch {
                launch_price: Some("R$ 10".to_string()),
                ..AppSettingsPatch::default()
            },
            AppSettingsPatch {
                launch_price: Some("-1".to_string()),
                ..AppSettingsPatch::default()
            },
            AppSettingsPatch {
                sheets_webhook_url: Some("script.google.com".to_string()),
                ..AppSettingsPatch::default()
            },
        ] {
            assert!(matches!(
                service.update(&patch).await,
                Err(SettingsError::Invalid { .. })
            ));
        }

        assert!(matches!(
            service.update(&AppSettingsPatch::default()).await,
            Err(SettingsError::EmptyPatch)
        ));
    }
}
