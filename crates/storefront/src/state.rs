//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio::task::JoinHandle;

use crate::config::StorefrontConfig;
use crate::db::{BookRepository, CartRepository, OrderRepository, SettingsRepository};
use crate::services::address::AddressError;
use crate::services::notify::{NotifyError, WebhookSink};
use crate::services::shipping::RateProvider;
use crate::services::{
    AddressLookup, AddressResolver, AuthError, BackendAuthClient, CartPersistence, Catalog,
    Checkout, HttpWebhookSink, MercadoPagoClient, OrderLedger, OrderNotifier, PaymentError,
    PaymentGateway, SettingsCache, SettingsStore, ShippingQuoter, TableRateProvider,
    TokenVerifier, ViaCepClient,
};

/// Per-request timeout of webhook deliveries.
const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Error building the external clients.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("postal lookup client: {0}")]
    Address(#[from] AddressError),
    #[error("payment client: {0}")]
    Payment(#[from] PaymentError),
    #[error("webhook client: {0}")]
    Notify(#[from] NotifyError),
    #[error("backend auth client: {0}")]
    Auth(#[from] AuthError),
}

/// The external systems the storefront talks to.
pub struct Collaborators {
    pub catalog: Arc<dyn Catalog>,
    pub carts: Arc<dyn CartPersistence>,
    pub ledger: Arc<dyn OrderLedger>,
    pub settings: Arc<dyn SettingsStore>,
    pub address_lookup: Arc<dyn AddressLookup>,
    pub rates: Arc<dyn RateProvider>,
    pub payments: Arc<dyn PaymentGateway>,
    pub webhooks: Arc<dyn WebhookSink>,
    pub tokens: Arc<dyn TokenVerifier>,
}

impl Collaborators {
    /// Postgres repositories and HTTP clients built from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn from_config(config: &StorefrontConfig, pool: &PgPool) -> Result<Self, StateError> {
        let checkout = &config.checkout;
        Ok(Self {
            catalog: Arc::new(BookRepository::new(pool.clone())),
            carts: Arc::new(CartRepository::new(pool.clone())),
            ledger: Arc::new(OrderRepository::new(pool.clone())),
            settings: Arc::new(SettingsRepository::new(pool.clone())),
            address_lookup: Arc::new(ViaCepClient::new(
                &checkout.postal_lookup_url,
                checkout.postal_lookup_timeout,
            )?),
            rates: Arc::new(TableRateProvider::new(checkout.shipping_quote_latency)),
            payments: Arc::new(MercadoPagoClient::new(&config.payment)?),
            webhooks: Arc::new(HttpWebhookSink::new(WEBHOOK_TIMEOUT)?),
            tokens: Arc::new(BackendAuthClient::new(&config.backend)?),
        })
    }
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    catalog: Arc<dyn Catalog>,
    carts: Arc<dyn CartPersistence>,
    ledger: Arc<dyn OrderLedger>,
    tokens: Arc<dyn TokenVerifier>,
    settings: SettingsCache,
    checkout: Checkout,
}

impl AppState {
    /// Create the application state with the production collaborators.
    ///
    /// Also returns the handle of the webhook delivery worker.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn new(
        config: StorefrontConfig,
        pool: PgPool,
    ) -> Result<(Self, JoinHandle<()>), StateError> {
        let collaborators = Collaborators::from_config(&config, &pool)?;
        Ok(Self::with_collaborators(config, pool, collaborators))
    }

    /// Create the application state around the given collaborators.
    #[must_use]
    pub fn with_collaborators(
        config: StorefrontConfig,
        pool: PgPool,
        collaborators: Collaborators,
    ) -> (Self, JoinHandle<()>) {
        let checkout_config = &config.checkout;
        let settings = SettingsCache::new(collaborators.settings, config.settings_cache_ttl);
        let (notifier, worker) = OrderNotifier::spawn(
            checkout_config.webhook_queue_capacity,
            collaborators.webhooks,
        );
        let checkout = Checkout::new(
            AddressResolver::new(
                collaborators.address_lookup,
                checkout_config.postal_lookup_timeout,
            ),
            ShippingQuoter::new(collaborators.rates, checkout_config.shipping_quote_timeout),
            Arc::clone(&collaborators.ledger),
            collaborators.payments,
            notifier,
            settings.clone(),
            config.checkout_return_url(),
        );

        let state = Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                catalog: collaborators.catalog,
                carts: collaborators.carts,
                ledger: collaborators.ledger,
                tokens: collaborators.tokens,
                settings,
                checkout,
            }),
        };
        (state, worker)
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.inner.catalog
    }

    /// Remote cart storage.
    #[must_use]
    pub fn carts(&self) -> &Arc<dyn CartPersistence> {
        &self.inner.carts
    }

    #[must_use]
    pub fn ledger(&self) -> &Arc<dyn OrderLedger> {
        &self.inner.ledger
    }

    #[must_use]
    pub fn tokens(&self) -> &Arc<dyn TokenVerifier> {
        &self.inner.tokens
    }

    /// Cached application settings.
    #[must_use]
    pub fn settings(&self) -> &SettingsCache {
        &self.inner.settings
    }

    /// The checkout orchestrator.
    #[must_use]
    pub fn checkout(&self) -> &Checkout {
        &self.inner.checkout
    }
}
