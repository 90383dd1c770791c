//! Public store settings.

use axum::{Json, extract::State};
use rhema_core::{AppSettings, BookId, Money};
use serde::Serialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Settings the storefront may show. The webhook target stays private.
#[derive(Debug, Serialize)]
pub struct PublicSettings {
    pub support_email: String,
    pub launch_book_id: Option<BookId>,
    pub launch_price: Option<Money>,
    pub launch_date: Option<String>,
    pub is_pre_launch: bool,
}

impl From<AppSettings> for PublicSettings {
    fn from(settings: AppSettings) -> Self {
        Self {
            support_email: settings.support_email,
            launch_book_id: settings.launch_book_id,
            launch_price: settings.launch_price,
            launch_date: settings.launch_date,
            is_pre_launch: settings.is_pre_launch,
        }
    }
}

/// Launch and contact settings.
#[instrument(skip_all)]
pub async fn show(State(state): State<AppState>) -> Result<Json<PublicSettings>> {
    let settings = state
        .settings()
        .get()
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(settings.into()))
}
