//! Staff sign-in and sign-out.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{clear_current_user, set_current_user};
use crate::models::{CurrentUser, StaffUser};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SessionRequest {
    pub access_token: String,
}

/// Exchange a backend access token for a back-office session.
///
/// Users without a staff profile are refused before any session is created.
#[instrument(skip_all)]
pub async fn create_session(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<SessionRequest>,
) -> Result<Json<StaffUser>> {
    let verified = state.tokens().verify(request.access_token.trim()).await?;

    let role = state.roles().role_of(verified.id).await?;
    let Some(role) = role.filter(|r| r.is_staff()) else {
        warn!(user_id = %verified.id, "Non-staff sign-in refused");
        return Err(AppError::Forbidden("back-office access required".to_string()));
    };

    let user = CurrentUser {
        id: verified.id,
        email: verified.email,
    };
    set_current_user(&session, &user).await?;
    set_sentry_user(&user.id, Some(&user.email));
    info!(user_id = %user.id, %role, "Staff signed in");

    Ok(Json(StaffUser {
        id: user.id,
        email: user.email,
        role,
    }))
}

/// Sign out and drop the session.
#[instrument(skip_all)]
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}
