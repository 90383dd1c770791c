//! Staff authentication extractor.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tower_sessions::Session;

use crate::models::{CurrentUser, StaffUser, session_keys};
use crate::state::AppState;

/// Extractor that requires a signed-in user with a staff role.
///
/// Anonymous requests get 401. Signed-in users without an `admin` or
/// `secretary` profile get 403.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireStaff(staff): RequireStaff) -> impl IntoResponse {
///     format!("Hello, {}!", staff.email)
/// }
/// ```
pub struct RequireStaff(pub StaffUser);

/// Why a request was refused back-office access.
#[derive(Debug, PartialEq, Eq)]
pub enum StaffRejection {
    Unauthorized,
    Forbidden,
    /// The role could not be looked up.
    Unavailable,
}

impl IntoResponse for StaffRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Sign in required"),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Back-office access required"),
            Self::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Could not verify access, please try again",
            ),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl FromRequestParts<AppState> for RequireStaff {
    type Rejection = StaffRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(StaffRejection::Unauthorized)?;

        let user: CurrentUser = session
            .get(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten()
            .ok_or(StaffRejection::Unauthorized)?;

        let role = state.roles().role_of(user.id).await.map_err(|error| {
            tracing::error!(%error, user_id = %user.id, "Role lookup failed");
            StaffRejection::Unavailable
        })?;

        match role {
            Some(role) if role.is_staff() => Ok(Self(StaffUser {
                id: user.id,
                email: user.email,
                role,
            })),
            _ => Err(StaffRejection::Forbidden),
        }
    }
}

/// Store the signed-in user, cycling the session id first.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Drop the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
