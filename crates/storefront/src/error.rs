//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`.
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
use crate::services::auth::AuthError;
use crate::services::{CartError, CheckoutError, PaymentError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Checkout transition refused or failed.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// Access token verification failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Session store failure.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Cart(CartError::Storage(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Cart(CartError::Remote(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Checkout(err) => match err {
                CheckoutError::Validation(_) | CheckoutError::UnknownShippingOption => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                CheckoutError::EmptyCart
                | CheckoutError::InvalidStep(_)
                | CheckoutError::SubmissionInFlight => StatusCode::CONFLICT,
                CheckoutError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
                CheckoutError::Payment(PaymentError::MissingAccessToken) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                CheckoutError::Payment(_) => StatusCode::BAD_GATEWAY,
            },
            Self::Auth(err) => match err {
                AuthError::InvalidToken | AuthError::MissingEmail => StatusCode::UNAUTHORIZED,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::Session(_)
                | Self::Internal(_)
                | Self::Cart(_)
                | Self::Checkout(CheckoutError::Ledger(_))
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            Self::Cart(_) => "Your cart could not be loaded, please try again".to_string(),
            Self::Auth(AuthError::InvalidToken | AuthError::MissingEmail) => {
                "Invalid credentials".to_string()
            }
            Self::Auth(_) => "Authentication service unavailable".to_string(),
            // Checkout messages are written for the customer.
            Self::Checkout(err) => err.to_string(),
            _ => self.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
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
    use super::*;
    use crate::services::checkout::CheckoutStep;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("book".to_string());
        assert_eq!(err.to_string(), "Not found: book");

        let err = AppError::from(CheckoutError::Validation("Fill it in.".to_string()));
        assert_eq!(err.to_string(), "Fill it in.");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(CheckoutError::Validation("x".to_string()).into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(CheckoutError::InvalidStep(CheckoutStep::Success).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(CheckoutError::Payment(PaymentError::MissingRedirect).into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AuthError::InvalidToken.into()),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_ledger_error_hides_database_detail() {
        let err = AppError::from(CheckoutError::Ledger(RepositoryError::DataCorruption(
            "orders.amount".to_string(),
        )));
        assert_eq!(err.to_string(), "could not save your order, please try again");
    }
}
