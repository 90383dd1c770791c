//! Staff identification.
//!
//! Staff sign in through the backend's auth API in the browser, like
//! customers. The back office verifies the access token with the backend and
//! then checks the profile role. Roles are looked up again on every request,
//! so a demotion takes effect immediately.

use async_trait::async_trait;
use rhema_core::{ProfileRole, UserId};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use crate::config::BackendConfig;
use crate::db::RepositoryError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid or expired access token")]
    InvalidToken,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("auth service returned status {0}")]
    Status(u16),

    #[error("user has no email address")]
    MissingEmail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedUser {
    pub id: UserId,
    pub email: String,
}

/// Resolves access tokens to users.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, access_token: &str) -> Result<VerifiedUser, AuthError>;
}

/// Resolves users to their profile role.
#[async_trait]
pub trait RoleLookup: Send + Sync {
    /// `None` when the user has no profile.
    async fn role_of(&self, user_id: UserId) -> Result<Option<ProfileRole>, RepositoryError>;
}

#[derive(Debug, Deserialize)]
struct BackendUser {
    id: UserId,
    #[serde(default)]
    email: Option<String>,
}

/// Client for `GET {backend}/auth/v1/user`.
#[derive(Clone)]
pub struct BackendAuthClient {
    client: reqwest::Client,
    base_url: String,
    anon_key: SecretString,
}

impl BackendAuthClient {
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &BackendConfig) -> Result<Self, AuthError> {
        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()?,
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
        })
    }
}

#[async_trait]
impl TokenVerifier for BackendAuthClient {
    #[instrument(skip_all)]
    async fn verify(&self, access_token: &str) -> Result<VerifiedUser, AuthError> {
        let response = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", self.anon_key.expose_secret())
            .bearer_auth(access_token)
            .send()
            .await?;

        match response.status() {
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                return Err(AuthError::InvalidToken);
            }
            status if !status.is_success() => return Err(AuthError::Status(status.as_u16())),
            _ => {}
        }

        let user: BackendUser = response.json().await?;
        let email = user
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or(AuthError::MissingEmail)?;
        Ok(VerifiedUser { id: user.id, email })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    fn client(server: &MockServer) -> BackendAuthClient {
        BackendAuthClient::new(&BackendConfig {
            url: format!("{}/", server.base_url()),
            anon_key: SecretString::from("anon-key"),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_verify_sends_key_and_token() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/auth/v1/user")
                    .header("apikey", "anon-key")
                    .header("authorization", "Bearer staff-token");
                then.status(200).json_body(json!({
                    "id": "0d9f5d2e-3c1b-4a8e-9f0a-6b7c8d9e0f1a",
                    "email": "secretaria@example.com"
                }));
            })
            .await;

        let user = client(&server).verify("staff-token").await.unwrap();

        mock.assert_async().await;
        assert_eq!(user.email, "secretaria@example.com");
    }

    #[tokio::test]
    async fn test_user_without_email_is_rejected() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/auth/v1/user");
                then.status(200)
                    .json_body(json!({"id": "0d9f5d2e-3c1b-4a8e-9f0a-6b7c8d9e0f1a"}));
            })
            .await;

        let err = client(&server).verify("token").await.unwrap_err();
        assert!(matches!(err, AuthError::MissingEmail));
    }

    #[tokio::test]
    async fn test_server_error_is_not_an_invalid_token() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/auth/v1/user");
                then.status(500);
            })
            .await;

        let err = client(&server).verify("token").await.unwrap_err();
        assert!(matches!(err, AuthError::Status(500)));
    }
}
