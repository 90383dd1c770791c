//! Mercado Pago checkout preferences.
//!
//! A preference is the hosted checkout page the customer is redirected to.
//! The gateway rejects `auto_return` for callback URLs on loopback hosts, so
//! it is only requested for public return URLs.

use std::net::IpAddr;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use rhema_core::NewOrder;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::config::PaymentConfig;

/// Phone number sent when the customer left it empty.
const PLACEHOLDER_PHONE: &str = "000000000";

/// Errors while creating a payment preference.
///
/// Messages are shown to the customer as-is.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// No access token configured on the server.
    #[error("MP_ACCESS_TOKEN is not configured on the server")]
    MissingAccessToken,

    /// HTTP request failed.
    #[error("payment gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway rejected the request.
    #[error("payment gateway error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Gateway answered without a checkout link.
    #[error("payment link was not generated")]
    MissingRedirect,

    /// Access token contains characters not allowed in a header.
    #[error("invalid access token: {0}")]
    InvalidToken(String),
}

/// Where to send the customer to pay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentRedirect {
    pub preference_id: Option<String>,
    pub init_point: String,
    pub sandbox_init_point: Option<String>,
}

/// External payment collaborator.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout for `order` returning to `return_url`.
    async fn create_preference(
        &self,
        order: &NewOrder,
        return_url: &str,
    ) -> Result<PaymentRedirect, PaymentError>;
}

// =============================================================================
// Request body
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreferenceRequest {
    pub items: Vec<PreferenceItem>,
    pub payer: Payer,
    pub back_urls: BackUrls,
    pub external_reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_return: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreferenceItem {
    pub id: String,
    pub title: String,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Payer {
    pub name: String,
    pub email: String,
    pub phone: PayerPhone,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayerPhone {
    pub number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackUrls {
    pub success: String,
    pub failure: String,
    pub pending: String,
}

/// Build the preference body for `order`.
///
/// Shipping, when charged, is sent as its own item so the gateway total
/// matches the order amount.
#[must_use]
pub fn build_preference(order: &NewOrder, return_url: &str) -> PreferenceRequest {
    let mut items: Vec<PreferenceItem> = order
        .items
        .iter()
        .map(|item| PreferenceItem {
            id: item
                .book_id
                .map_or_else(|| "book-id".to_string(), |id| id.to_string()),
            title: item.title.clone(),
            quantity: item.quantity,
            unit_price: item.price.amount(),
        })
        .collect();

    if let Some(cost) = order.shipping_cost.filter(|cost| !cost.is_zero()) {
        items.push(PreferenceItem {
            id: "shipping".to_string(),
            title: order
                .shipping_method
                .clone()
                .unwrap_or_else(|| "Frete".to_string()),
            quantity: 1,
            unit_price: cost.amount(),
        });
    }

    let phone = if order.customer_phone.trim().is_empty() {
        PLACEHOLDER_PHONE.to_string()
    } else {
        order.customer_phone.clone()
    };

    PreferenceRequest {
        items,
        payer: Payer {
            name: order.customer_name.clone(),
            email: order.customer_email.clone(),
            phone: PayerPhone { number: phone },
        },
        back_urls: BackUrls {
            success: format!("{return_url}?status=success"),
            failure: format!("{return_url}?status=failure"),
            pending: format!("{return_url}?status=pending"),
        },
        external_reference: order.id.to_string(),
        auto_return: (!is_loopback_url(return_url)).then_some("approved"),
    }
}

/// Whether `url` points at this machine (`localhost`, `127.0.0.1`, `::1`).
///
/// Unparseable URLs fall back to a substring check.
#[must_use]
pub fn is_loopback_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => match parsed.host() {
            Some(url::Host::Domain(domain)) => {
                domain.eq_ignore_ascii_case("localhost") || domain.ends_with(".localhost")
            }
            Some(url::Host::Ipv4(ip)) => IpAddr::V4(ip).is_loopback(),
            Some(url::Host::Ipv6(ip)) => IpAddr::V6(ip).is_loopback(),
            None => true,
        },
        Err(_) => url.contains("localhost") || url.contains("127.0.0.1"),
    }
}

// =============================================================================
// Client
// =============================================================================

#[derive(Debug, Deserialize)]
struct PreferenceResponse {
    id: Option<String>,
    init_point: Option<String>,
    sandbox_init_point: Option<String>,
}

/// Mercado Pago REST client.
#[derive(Clone)]
pub struct MercadoPagoClient {
    client: reqwest::Client,
    api_url: String,
    access_token: Option<SecretString>,
}

impl MercadoPagoClient {
    /// Create a client from configuration.
    ///
    /// A missing access token is allowed here and reported on first use.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &PaymentConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()?;
        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
        })
    }

    fn auth_headers(&self) -> Result<HeaderMap, PaymentError> {
        let token = self
            .access_token
            .as_ref()
            .ok_or(PaymentError::MissingAccessToken)?;
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|e| PaymentError::InvalidToken(e.to_string()))?,
        );
        Ok(headers)
    }
}

#[async_trait]
impl PaymentGateway for MercadoPagoClient {
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    async fn create_preference(
        &self,
        order: &NewOrder,
        return_url: &str,
    ) -> Result<PaymentRedirect, PaymentError> {
        let headers = self.auth_headers()?;
        let body = build_preference(order, return_url);

        let response = self
            .client
            .post(format!("{}/checkout/preferences", self.api_url))
            .headers(headers)
            .json(&body)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let preference: PreferenceResponse = response.json().await?;
        let init_point = preference
            .init_point
            .filter(|link| !link.is_empty())
            .ok_or(PaymentError::MissingRedirect)?;

        Ok(PaymentRedirect {
            preference_id: preference.id,
            init_point,
            sandbox_init_point: preference.sandbox_init_point,
        })
    }
}
