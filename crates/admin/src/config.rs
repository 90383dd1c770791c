//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `ADMIN_BASE_URL` - Public URL for the back office
//! - `BACKEND_URL` - Base URL of the backend platform (auth API)
//! - `BACKEND_ANON_KEY` - Public API key for the backend platform
//!
//! ## Optional
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3001)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Performance sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    pub host: IpAddr,
    pub port: u16,
    /// Public base URL for the back office
    pub base_url: String,
    /// Backend platform (auth API) configuration
    pub backend: BackendConfig,
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
}

/// Backend platform configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct BackendConfig {
    pub url: String,
    pub anon_key: SecretString,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url)
            .field("anon_key", &"[REDACTED]")
            .finish()
    }
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(&|key: &str| std::env::var(key).ok())
    }

    /// Build the configuration from any variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(env: &Lookup<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: get_database_url(env, "ADMIN_DATABASE_URL")?,
            host: get_parsed_env(env, "ADMIN_HOST", "127.0.0.1")?,
            port: get_parsed_env(env, "ADMIN_PORT", "3001")?,
            base_url: get_required_env(env, "ADMIN_BASE_URL")?,
            backend: BackendConfig {
                url: get_required_env(env, "BACKEND_URL")?,
                anon_key: SecretString::from(get_required_env(env, "BACKEND_ANON_KEY")?),
            },
            sentry_dsn: env("SENTRY_DSN"),
            sentry_environment: env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: get_parsed_env(env, "SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: get_parsed_env(env, "SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Source of configuration variables, `std::env::var` outside tests.
pub type Lookup<'a> = dyn Fn(&str) -> Option<String> + 'a;

fn get_required_env(env: &Lookup<'_>, key: &str) -> Result<String, ConfigError> {
    env(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(env: &Lookup<'_>, primary_key: &str) -> Result<SecretString, ConfigError> {
    env(primary_key)
        .or_else(|| env("DATABASE_URL"))
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_string()))
}

fn get_parsed_env<T>(env: &Lookup<'_>, key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env(key).unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
impl AdminConfig {
    pub(crate) fn for_tests() -> Self {
        Self {
            database_url: SecretString::from("postgres://localhost/test"),
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3001,
            base_url: "https://admin.example.com".to_string(),
            backend: BackendConfig {
                url: "https://backend.example.com".to_string(),
                anon_key: SecretString::from("anon_key_value"),
            },
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<AdminConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        AdminConfig::from_lookup(&|key: &str| vars.get(key).cloned())
    }

    #[test]
    fn test_from_lookup_needs_no_session_secret() {
        let config = load(&[
            ("ADMIN_DATABASE_URL", "postgres://localhost/rhema"),
            ("ADMIN_BASE_URL", "https://admin.example.com"),
            ("BACKEND_URL", "https://backend.example.com"),
            ("BACKEND_ANON_KEY", "anon"),
            ("ADMIN_PORT", "4001"),
        ])
        .unwrap();

        assert_eq!(config.socket_addr().port(), 4001);
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_invalid_port_is_reported() {
        let err = load(&[
            ("DATABASE_URL", "postgres://localhost/rhema"),
            ("ADMIN_PORT", "admin"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "ADMIN_PORT"));
    }

    #[test]
    fn test_socket_addr_and_redaction() {
        let config = AdminConfig::for_tests();
        assert_eq!(config.socket_addr().port(), 3001);

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("anon_key_value"));
    }
}
