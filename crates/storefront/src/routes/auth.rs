//! Session sign-in and sign-out.
//!
//! The browser signs in against the backend's auth API and hands the access
//! token to `POST /auth/session`. The token is verified server-side; only
//! the resulting user id and email are kept.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument};

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SessionRequest {
    pub access_token: String,
}

/// Exchange a backend access token for a signed-in session.
#[instrument(skip_all)]
pub async fn create_session(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<SessionRequest>,
) -> Result<Json<CurrentUser>> {
    let verified = state.tokens().verify(request.access_token.trim()).await?;
    let user = CurrentUser {
        id: verified.id,
        email: verified.email,
    };

    set_current_user(&session, &user).await?;
    set_sentry_user(&user.id, Some(&user.email));
    info!(user_id = %user.id, "User signed in");
    Ok(Json(user))
}

/// Sign out and drop the session.
#[instrument(skip_all)]
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}
