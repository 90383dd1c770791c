//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AdminConfig;
use crate::db::{BookRepository, OrderRepository, ProfileRepository, SettingsRepository};
use crate::services::{
    AuthError, BackendAuthClient, BookCatalog, OrderAdmin, OrderService, RoleLookup,
    SettingsService, SettingsStore, TokenVerifier,
};

/// Storage and identity collaborators.
pub struct Collaborators {
    pub orders: Arc<dyn OrderAdmin>,
    pub books: Arc<dyn BookCatalog>,
    pub settings: Arc<dyn SettingsStore>,
    pub roles: Arc<dyn RoleLookup>,
    pub tokens: Arc<dyn TokenVerifier>,
}

impl Collaborators {
    /// Production collaborators backed by `PostgreSQL` and the backend auth API.
    ///
    /// # Errors
    ///
    /// Returns an error if the auth HTTP client cannot be built.
    pub fn from_config(config: &AdminConfig, pool: &PgPool) -> Result<Self, AuthError> {
        Ok(Self {
            orders: Arc::new(OrderRepository::new(pool.clone())),
            books: Arc::new(BookRepository::new(pool.clone())),
            settings: Arc::new(SettingsRepository::new(pool.clone())),
            roles: Arc::new(ProfileRepository::new(pool.clone())),
            tokens: Arc::new(BackendAuthClient::new(&config.backend)?),
        })
    }
}

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: PgPool,
    books: Arc<dyn BookCatalog>,
    roles: Arc<dyn RoleLookup>,
    tokens: Arc<dyn TokenVerifier>,
    orders: OrderService,
    settings: SettingsService,
}

impl AppState {
    /// Build state with the production collaborators.
    ///
    /// # Errors
    ///
    /// Returns an error if the auth HTTP client cannot be built.
    pub fn new(config: AdminConfig, pool: PgPool) -> Result<Self, AuthError> {
        let collaborators = Collaborators::from_config(&config, &pool)?;
        Ok(Self::with_collaborators(config, pool, collaborators))
    }

    #[must_use]
    pub fn with_collaborators(
        config: AdminConfig,
        pool: PgPool,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                books: collaborators.books,
                roles: collaborators.roles,
                tokens: collaborators.tokens,
                orders: OrderService::new(collaborators.orders),
                settings: SettingsService::new(collaborators.settings),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn books(&self) -> &Arc<dyn BookCatalog> {
        &self.inner.books
    }

    #[must_use]
    pub fn roles(&self) -> &Arc<dyn RoleLookup> {
        &self.inner.roles
    }

    #[must_use]
    pub fn tokens(&self) -> &Arc<dyn TokenVerifier> {
        &self.inner.tokens
    }

    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }

    #[must_use]
    pub fn settings(&self) -> &SettingsService {
        &self.inner.settings
    }
}
