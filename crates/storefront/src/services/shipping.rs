//! Shipping Quoter.
//!
//! Physical orders get a fixed menu of delivery methods priced from a base
//! rate per Brazilian region. All-digital orders get a single free option with
//! no carrier call at all.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rhema_core::{Money, ShippingOption, ShippingOptionId};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

/// Errors while computing shipping options.
#[derive(Debug, Error)]
pub enum ShippingError {
    /// The rate provider did not answer in time.
    #[error("shipping quote timed out after {0:?}")]
    Timeout(Duration),

    /// The rate provider failed.
    #[error("shipping provider error: {0}")]
    Provider(String),
}

/// Base rate used for state codes outside the table.
pub const DEFAULT_BASE_PRICE: Money = Money::from_cents(2290);

/// Flat fee for hand delivery inside Cerejeiras.
pub const LOCAL_DELIVERY_PRICE: Money = Money::from_cents(600);

/// (states, base price) per region.
const REGION_BASE_PRICES: &[(&[&str], Money)] = &[
    // Sudeste
    (&["SP", "RJ", "MG", "ES"], Money::from_cents(1450)),
    // Sul
    (&["PR", "SC", "RS"], Money::from_cents(2490)),
    // Centro-Oeste
    (&["MS", "MT", "GO", "DF"], Money::from_cents(2800)),
    // Nordeste
    (
        &["BA", "PE", "CE", "RN", "PB", "AL", "SE", "MA", "PI"],
        Money::from_cents(3850),
    ),
    // Norte
    (
        &["AM", "PA", "AC", "RO", "RR", "AP", "TO"],
        Money::from_cents(4590),
    ),
];

/// Base shipping price for a state code (case-insensitive).
#[must_use]
pub fn base_price_for(region: &str) -> Money {
    let code = region.trim().to_uppercase();
    REGION_BASE_PRICES
        .iter()
        .find(|(states, _)| states.contains(&code.as_str()))
        .map_or(DEFAULT_BASE_PRICE, |(_, price)| *price)
}

/// The only option offered when nothing has to be shipped.
#[must_use]
pub fn digital_option() -> ShippingOption {
    ShippingOption {
        id: ShippingOptionId::Digital,
        name: "Entrega Digital".to_string(),
        price: Money::ZERO,
        delivery_time: "Imediato".to_string(),
    }
}

/// Delivery menu for physical items shipped to `region`.
///
/// Pickup comes first and is the default selection.
#[must_use]
pub fn physical_options(region: &str) -> Vec<ShippingOption> {
    let base = base_price_for(region);
    let option = |id, name: &str, price, delivery_time: &str| ShippingOption {
        id,
        name: name.to_string(),
        price,
        delivery_time: delivery_time.to_string(),
    };

    vec![
        option(
            ShippingOptionId::Pickup,
            "Retirar na Igreja",
            Money::ZERO,
            "Combinar horário",
        ),
        option(
            ShippingOptionId::Cerejeiras,
            "Entrega em Cerejeiras",
            LOCAL_DELIVERY_PRICE,
            "1 dia útil",
        ),
        option(
            ShippingOptionId::Pac,
            "Correios PAC",
            base,
            "8 a 15 dias úteis",
        ),
        option(
            ShippingOptionId::Sedex,
            "Correios SEDEX",
            base.scaled(Decimal::new(175, 2)),
            "2 a 5 dias úteis",
        ),
        option(
            ShippingOptionId::Jadlog,
            "Jadlog Econômico",
            base.scaled(Decimal::new(9, 1)),
            "10 a 18 dias úteis",
        ),
    ]
}

/// Source of carrier rates for physical shipments.
#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn physical_rates(&self, region: &str) -> Result<Vec<ShippingOption>, ShippingError>;
}

/// Rates from the regional table, answered after a fixed delay to behave
/// like a carrier API.
#[derive(Debug, Clone)]
pub struct TableRateProvider {
    latency: Duration,
}

impl TableRateProvider {
    #[must_use]
    pub const fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl RateProvider for TableRateProvider {
    async fn physical_rates(&self, region: &str) -> Result<Vec<ShippingOption>, ShippingError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(physical_options(region))
    }
}

/// Options offered for one destination, plus the pre-selected one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShippingQuote {
    pub options: Vec<ShippingOption>,
    pub selected: Option<ShippingOptionId>,
}

/// Computes shipping quotes with a timeout around the rate provider.
#[derive(Clone)]
pub struct ShippingQuoter {
    provider: Arc<dyn RateProvider>,
    timeout: Duration,
}

impl ShippingQuoter {
    #[must_use]
    pub fn new(provider: Arc<dyn RateProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Quote delivery to `region`.
    ///
    /// Without physical items this returns the free digital option, selected,
    /// immediately. Otherwise the first option returned is selected.
    ///
    /// # Errors
    ///
    /// Returns `ShippingError` if the provider fails or times out.
    #[instrument(skip(self))]
    pub async fn quote(
        &self,
        region: &str,
        has_physical_items: bool,
    ) -> Result<ShippingQuote, ShippingError> {
        if !has_physical_items {
            let option = digital_option();
            return Ok(ShippingQuote {
                selected: Some(option.id),
                options: vec![option],
            });
        }

        let options = tokio::time::timeout(self.timeout, self.provider.physical_rates(region))
            .await
            .map_err(|_| ShippingError::Timeout(self.timeout))??;

        Ok(ShippingQuote {
            selected: options.first().map(|option| option.id),
            options,
        })
    }
}
