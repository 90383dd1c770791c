//! Address Resolver.
//!
//! Resolves a postal code to street, neighborhood, city and state through the
//! `ViaCEP` API. Lookups are bounded by a timeout; a hang or transport error
//! becomes [`Resolution::Unavailable`] so the customer can type the address by
//! hand.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rhema_core::{PostalCode, ResolvedAddress};
use serde::Deserialize;
use thiserror::Error;
use tracing::{instrument, warn};

/// Errors from the postal lookup service itself.
#[derive(Debug, Error)]
pub enum AddressError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Lookup service answered with an unexpected status.
    #[error("lookup service returned status {0}")]
    Status(u16),

    /// Lookup did not answer in time.
    #[error("lookup timed out after {0:?}")]
    Timeout(Duration),
}

/// External postal code lookup.
#[async_trait]
pub trait AddressLookup: Send + Sync {
    /// `Ok(None)` when the postal code does not exist.
    async fn lookup(&self, code: &PostalCode) -> Result<Option<ResolvedAddress>, AddressError>;
}

/// Outcome of resolving a postal code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(ResolvedAddress),
    /// Malformed or unknown postal code.
    NotFound,
    /// Lookup failed or timed out; fall back to manual entry.
    Unavailable,
}

/// Resolves postal codes with a timeout.
#[derive(Clone)]
pub struct AddressResolver {
    lookup: Arc<dyn AddressLookup>,
    timeout: Duration,
}

impl AddressResolver {
    #[must_use]
    pub fn new(lookup: Arc<dyn AddressLookup>, timeout: Duration) -> Self {
        Self { lookup, timeout }
    }

    /// Resolve raw postal code input.
    ///
    /// Input that does not contain exactly eight digits is `NotFound` without
    /// calling the lookup service.
    #[instrument(skip(self))]
    pub async fn resolve(&self, input: &str) -> Resolution {
        let Ok(code) = PostalCode::parse(input) else {
            return Resolution::NotFound;
        };

        let result = match tokio::time::timeout(self.timeout, self.lookup.lookup(&code)).await {
            Ok(result) => result,
            Err(_) => Err(AddressError::Timeout(self.timeout)),
        };

        match result {
            Ok(Some(address)) => Resolution::Found(address),
            Ok(None) => Resolution::NotFound,
            Err(error) => {
                warn!(error = %error, postal_code = %code, "Postal code lookup failed");
                Resolution::Unavailable
            }
        }
    }
}

/// `ViaCEP` HTTP client.
#[derive(Clone)]
pub struct ViaCepClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ViaCepResponse {
    /// Present (as `true` or `"true"`) when the code does not exist.
    #[serde(default)]
    erro: Option<serde_json::Value>,
    #[serde(default)]
    logradouro: String,
    #[serde(default)]
    bairro: String,
    #[serde(default)]
    localidade: String,
    #[serde(default)]
    uf: String,
}

impl ViaCepClient {
    /// Create a client for `base_url` (e.g. `https://viacep.com.br/ws`).
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AddressError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl AddressLookup for ViaCepClient {
    async fn lookup(&self, code: &PostalCode) -> Result<Option<ResolvedAddress>, AddressError> {
        let url = format!("{}/{}/json/", self.base_url, code.digits());
        let response = self.client.get(&url).send().await?;
        let status = response.status();

        // ViaCEP answers 400 for codes it considers malformed.
        if status == reqwest::StatusCode::BAD_REQUEST {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(AddressError::Status(status.as_u16()));
        }

        let body: ViaCepResponse = response.json().await?;
        if body.erro.is_some() {
            return Ok(None);
        }

        Ok(Some(ResolvedAddress {
            street: body.logradouro,
            neighborhood: body.bairro,
            city: body.localidade,
            region: body.uf,
        }))
    }
}
