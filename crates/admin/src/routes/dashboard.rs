//! Dashboard route handler.

use axum::{Json, extract::State};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::RequireStaff;
use crate::services::{Dashboard, summarize};
use crate::state::AppState;

/// Headline numbers and per-book sales.
#[instrument(skip_all)]
pub async fn show(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
) -> Result<Json<Dashboard>> {
    let (books, orders, settings) = tokio::try_join!(
        async { state.books().list_books().await.map_err(AppError::from) },
        async { state.orders().list_all().await.map_err(AppError::from) },
        async { state.settings().load().await.map_err(AppError::from) },
    )?;

    Ok(Json(summarize(&books, &orders, &settings)))
}
