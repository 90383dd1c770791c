//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `BACKEND_URL` - Base URL of the backend platform (auth API)
//! - `BACKEND_ANON_KEY` - Public API key for the backend platform
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `MP_ACCESS_TOKEN` - Mercado Pago access token (checkout fails at submit without it)
//! - `MP_API_URL` - Mercado Pago API base URL (default: <https://api.mercadopago.com>)
//! - `POSTAL_LOOKUP_URL` - `ViaCEP` base URL (default: <https://viacep.com.br/ws>)
//! - `POSTAL_LOOKUP_TIMEOUT_SECS` - Address lookup timeout (default: 8)
//! - `SHIPPING_QUOTE_LATENCY_MS` - Simulated carrier latency (default: 1200)
//! - `SHIPPING_QUOTE_TIMEOUT_SECS` - Shipping quote timeout (default: 8)
//! - `ORDER_WEBHOOK_QUEUE_CAPACITY` - Pending order notifications (default: 64)
//! - `SETTINGS_CACHE_TTL_SECS` - How long settings are cached (default: 60)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Performance sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

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

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Backend platform (auth API) configuration
    pub backend: BackendConfig,
    /// Payment gateway configuration
    pub payment: PaymentConfig,
    /// Checkout collaborator tuning
    pub checkout: CheckoutConfig,
    /// How long settings reads are cached
    pub settings_cache_ttl: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate
    pub sentry_traces_sample_rate: f32,
}

/// Backend platform configuration.
#[derive(Clone)]
pub struct BackendConfig {
    /// Base URL, e.g. `https://project.supabase.co`
    pub url: String,
    /// Public (anon) API key sent as `apikey`
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

/// Mercado Pago configuration.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct PaymentConfig {
    /// API base URL
    pub api_url: String,
    /// Access token. Missing is only an error when a checkout is submitted.
    pub access_token: Option<SecretString>,
}

impl std::fmt::Debug for PaymentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentConfig")
            .field("api_url", &self.api_url)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Address lookup, shipping quote and notification tuning.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// `ViaCEP` base URL (without trailing slash)
    pub postal_lookup_url: String,
    pub postal_lookup_timeout: Duration,
    pub shipping_quote_latency: Duration,
    pub shipping_quote_timeout: Duration,
    pub webhook_queue_capacity: usize,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            postal_lookup_url: "https://viacep.com.br/ws".to_string(),
            postal_lookup_timeout: Duration::from_secs(8),
            shipping_quote_latency: Duration::from_millis(1200),
            shipping_quote_timeout: Duration::from_secs(8),
            webhook_queue_capacity: 64,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(&|key: &str| std::env::var(key).ok())
    }

    /// Build the configuration from any variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(env: &Lookup<'_>) -> Result<Self, ConfigError> {
        let database_url = get_database_url(env, "STOREFRONT_DATABASE_URL")?;
        let host = get_parsed_env(env, "STOREFRONT_HOST", "127.0.0.1")?;
        let port = get_parsed_env(env, "STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env(env, "STOREFRONT_BASE_URL")?;

        let backend = BackendConfig::from_lookup(env)?;
        let payment = PaymentConfig::from_lookup(env);
        let checkout = CheckoutConfig::from_lookup(env)?;
        let settings_cache_ttl =
            Duration::from_secs(get_parsed_env(env, "SETTINGS_CACHE_TTL_SECS", "60")?);

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            backend,
            payment,
            checkout,
            settings_cache_ttl,
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

    /// Where the payment gateway sends the customer back to.
    #[must_use]
    pub fn checkout_return_url(&self) -> String {
        format!("{}/checkout/return", self.base_url.trim_end_matches('/'))
    }
}

impl BackendConfig {
    fn from_lookup(env: &Lookup<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            url: get_required_env(env, "BACKEND_URL")?,
            anon_key: SecretString::from(get_required_env(env, "BACKEND_ANON_KEY")?),
        })
    }
}

impl PaymentConfig {
    fn from_lookup(env: &Lookup<'_>) -> Self {
        Self {
            api_url: get_env_or_default(env, "MP_API_URL", "https://api.mercadopago.com"),
            access_token: env("MP_ACCESS_TOKEN")
                .filter(|token| !token.trim().is_empty())
                .map(SecretString::from),
        }
    }
}

impl CheckoutConfig {
    fn from_lookup(env: &Lookup<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            postal_lookup_url: get_env_or_default(
                env,
                "POSTAL_LOOKUP_URL",
                "https://viacep.com.br/ws",
            )
            .trim_end_matches('/')
            .to_string(),
            postal_lookup_timeout: Duration::from_secs(get_parsed_env(
                env,
                "POSTAL_LOOKUP_TIMEOUT_SECS",
                "8",
            )?),
            shipping_quote_latency: Duration::from_millis(get_parsed_env(
                env,
                "SHIPPING_QUOTE_LATENCY_MS",
                "1200",
            )?),
            shipping_quote_timeout: Duration::from_secs(get_parsed_env(
                env,
                "SHIPPING_QUOTE_TIMEOUT_SECS",
                "8",
            )?),
            webhook_queue_capacity: get_parsed_env(env, "ORDER_WEBHOOK_QUEUE_CAPACITY", "64")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Source of configuration variables, `std::env::var` outside tests.
pub type Lookup<'a> = dyn Fn(&str) -> Option<String> + 'a;

/// Get a required variable.
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

/// Get a variable with a default value.
fn get_env_or_default(env: &Lookup<'_>, key: &str, default: &str) -> String {
    env(key).unwrap_or_else(|| default.to_string())
}

/// Get a variable (or its default) parsed into `T`.
fn get_parsed_env<T>(env: &Lookup<'_>, key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, &get_env_or_default(env, key, default))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
impl StorefrontConfig {
    /// Fixed configuration for unit tests.
    pub(crate) fn for_tests() -> Self {
        Self {
            database_url: SecretString::from("postgres://localhost/test"),
            host: std::net::IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            base_url: "https://loja.example.com/".to_string(),
            backend: BackendConfig {
                url: "https://backend.example.com".to_string(),
                anon_key: SecretString::from("anon_key_value"),
            },
            payment: PaymentConfig {
                api_url: "https://api.mercadopago.com".to_string(),
                access_token: Some(SecretString::from("APP_USR-super-private")),
            },
            checkout: CheckoutConfig {
                shipping_quote_latency: Duration::ZERO,
                ..CheckoutConfig::default()
            },
            settings_cache_ttl: Duration::from_secs(60),
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

    fn config() -> StorefrontConfig {
        StorefrontConfig::for_tests()
    }

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        StorefrontConfig::from_lookup(&|key: &str| vars.get(key).cloned())
    }

    #[test]
    fn test_from_lookup_needs_no_session_secret() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/rhema"),
            ("STOREFRONT_BASE_URL", "https://loja.example.com"),
            ("BACKEND_URL", "https://backend.example.com"),
            ("BACKEND_ANON_KEY", "anon"),
        ])
        .unwrap();

        assert_eq!(config.port, 3000);
        assert!(config.payment.access_token.is_none());
        assert_eq!(config.checkout.webhook_queue_capacity, 64);
    }

    #[test]
    fn test_from_lookup_reports_missing_base_url() {
        let err = load(&[("DATABASE_URL", "postgres://localhost/rhema")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "STOREFRONT_BASE_URL"));
    }

    #[test]
    fn test_parse_value_reports_variable_name() {
        let err = parse_value::<u16>("STOREFRONT_PORT", "not-a-port").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "STOREFRONT_PORT"));
        assert_eq!(parse_value::<u64>("X", " 1200 ").unwrap(), 1200);
    }

    #[test]
    fn test_socket_addr() {
        let addr = config().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_checkout_return_url_strips_trailing_slash() {
        assert_eq!(
            config().checkout_return_url(),
            "https://loja.example.com/checkout/return"
        );
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug_output = format!("{:?}", config());

        assert!(debug_output.contains("backend.example.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("anon_key_value"));
        assert!(!debug_output.contains("super-private"));
    }
}
