//! Access token verification against the hosted backend.
//!
//! Sign-in itself happens in the browser against the backend's auth API. The
//! storefront only receives the resulting access token, asks the backend who
//! it belongs to and records that user in the session.

use async_trait::async_trait;
use rhema_core::UserId;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use crate::config::BackendConfig;

/// Errors while verifying an access token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The backend did not accept the token.
    #[error("invalid or expired access token")]
    InvalidToken,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("auth service returned status {0}")]
    Status(u16),

    /// The backend returned a user without an email.
    #[error("user has no email address")]
    MissingEmail,
}

/// User confirmed by the backend.
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

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(AuthError::InvalidToken);
        }
        if !status.is_success() {
            return Err(AuthError::Status(status.as_u16()));
        }

        let user: BackendUser = response.json().await?;
        let email = user
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or(AuthError::MissingEmail)?;
        Ok(VerifiedUser { id: user.id, email })
    }
}
