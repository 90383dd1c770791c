//! Settings route handlers.

use axum::{Json, extract::State};
use rhema_core::{AppSettings, AppSettingsPatch};
use tracing::{info, instrument};

use crate::error::Result;
use crate::middleware::RequireStaff;
use crate::state::AppState;

/// Current settings, defaults filled in.
#[instrument(skip_all)]
pub async fn show(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
) -> Result<Json<AppSettings>> {
    Ok(Json(state.settings().load().await?))
}

/// Apply a partial update and return the resulting settings.
#[instrument(skip_all)]
pub async fn update(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Json(patch): Json<AppSettingsPatch>,
) -> Result<Json<AppSettings>> {
    let settings = state.settings().update(&patch).await?;
    info!(user_id = %staff.id, "Settings updated");
    Ok(Json(settings))
}
