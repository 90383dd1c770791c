//! Process-wide application settings.
//!
//! Settings live in a flat key-value table. [`AppSettings`] is the typed view
//! of the keys the application understands; unknown keys are ignored and
//! malformed values fall back to their defaults.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{BookId, Money};

/// Support address shown when none is configured.
pub const DEFAULT_SUPPORT_EMAIL: &str = "msig12@gmail.com";

pub const KEY_LAUNCH_BOOK_ID: &str = "rhema_launch_book_id";
pub const KEY_LAUNCH_PRICE: &str = "rhema_launch_price";
pub const KEY_LAUNCH_DATE: &str = "rhema_launch_date";
pub const KEY_PRE_LAUNCH: &str = "rhema_prelaunch_mode";
pub const KEY_SHEETS_URL: &str = "rhema_sheets_url";
pub const KEY_SHEETS_ENABLED: &str = "rhema_sheets_enabled";
pub const KEY_SUPPORT_EMAIL: &str = "rhema_support_email";

/// Typed view over the settings table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    pub support_email: String,
    pub launch_book_id: Option<BookId>,
    pub launch_price: Option<Money>,
    /// Free-form date as entered by the admin (usually `YYYY-MM-DD`).
    pub launch_date: Option<String>,
    pub is_pre_launch: bool,
    pub sheets_webhook_url: Option<String>,
    pub sheets_enabled: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            support_email: DEFAULT_SUPPORT_EMAIL.to_string(),
            launch_book_id: None,
            launch_price: None,
            launch_date: None,
            is_pre_launch: false,
            sheets_webhook_url: None,
            sheets_enabled: false,
        }
    }
}

impl AppSettings {
    /// Build settings from stored `(key, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut settings = Self::default();
        for (key, value) in pairs {
            settings.apply(key.as_ref(), value.as_ref());
        }
        settings
    }

    fn apply(&mut self, key: &str, value: &str) {
        let value = value.trim();
        match key {
            KEY_SUPPORT_EMAIL if !value.is_empty() => self.support_email = value.to_string(),
            KEY_LAUNCH_BOOK_ID => self.launch_book_id = value.parse().ok(),
            KEY_LAUNCH_PRICE => {
                self.launch_price = Decimal::from_str(value).ok().map(Money::new);
            }
            KEY_LAUNCH_DATE => self.launch_date = non_empty(value),
            KEY_PRE_LAUNCH => self.is_pre_launch = value == "true",
            KEY_SHEETS_URL => self.sheets_webhook_url = non_empty(value),
            KEY_SHEETS_ENABLED => self.sheets_enabled = value == "true",
            _ => {}
        }
    }

    /// The webhook URL to notify on new orders, if the integration is on.
    #[must_use]
    pub fn order_webhook_url(&self) -> Option<&str> {
        if !self.sheets_enabled {
            return None;
        }
        self.sheets_webhook_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// A partial settings update. Only `Some` fields are written.
///
/// Optional settings take `Some(String::new())` to clear them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettingsPatch {
    pub support_email: Option<String>,
    pub launch_book_id: Option<String>,
    pub launch_price: Option<String>,
    pub launch_date: Option<String>,
    pub is_pre_launch: Option<bool>,
    pub sheets_webhook_url: Option<String>,
    pub sheets_enabled: Option<bool>,
}

impl AppSettingsPatch {
    /// The `(key, value)` pairs to upsert.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        let mut push = |key: &'static str, value: Option<String>| {
            if let Some(value) = value {
                pairs.push((key, value.trim().to_string()));
            }
        };
        push(KEY_SUPPORT_EMAIL, self.support_email.clone());
        push(KEY_LAUNCH_BOOK_ID, self.launch_book_id.clone());
        push(KEY_LAUNCH_PRICE, self.launch_price.clone());
        push(KEY_LAUNCH_DATE, self.launch_date.clone());
        push(KEY_PRE_LAUNCH, self.is_pre_launch.map(|b| b.to_string()));
        push(KEY_SHEETS_URL, self.sheets_webhook_url.clone());
        push(KEY_SHEETS_ENABLED, self.sheets_enabled.map(|b| b.to_string()));
        pairs
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_pairs().is_empty()
    }
}
