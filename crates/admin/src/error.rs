//! Unified error handling for the back office.
//!
//! Responses are JSON: `{"error": "<message>"}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{AuthError, OrdersError, SettingsError};

/// Application-level error type for the back office.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    #[error(transparent)]
    Orders(#[from] OrdersError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// Access token verification failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// User lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_)
            | Self::Session(_)
            | Self::Orders(OrdersError::Repository(_))
            | Self::Settings(SettingsError::Repository(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Orders(OrdersError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Orders(_) | Self::Settings(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Auth(AuthError::InvalidToken | AuthError::MissingEmail) => {
                StatusCode::UNAUTHORIZED
            }
            Self::Auth(_) => StatusCode::BAD_GATEWAY,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            _ if status == StatusCode::INTERNAL_SERVER_ERROR => "Internal server error".to_string(),
            Self::Auth(AuthError::InvalidToken | AuthError::MissingEmail) => {
                "Invalid credentials".to_string()
            }
            Self::Auth(_) => "Authentication service unavailable".to_string(),
            _ => self.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the signed-in staff member.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use rhema_core::OrderId;

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(OrdersError::NotFound(OrderId::generate()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(OrdersError::EmptyUpdate.into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(SettingsError::EmptyPatch.into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AuthError::InvalidToken.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(RepositoryError::DataCorruption("orders.status".to_string()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_wrapped_repository_errors_are_server_errors() {
        let err = AppError::from(OrdersError::Repository(RepositoryError::DataCorruption(
            "x".to_string(),
        )));
        assert_eq!(get_status(err), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
