//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::db::PgCustomerRepository;
use crate::services::{CustomerService, PostalCodeError, ViaCepClient};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
///
/// The store and postal code lookup default to the production
/// implementations; tests substitute in-memory fakes.
pub struct AppState<S = PgCustomerRepository, P = ViaCepClient> {
    inner: Arc<AppStateInner<S, P>>,
}

struct AppStateInner<S, P> {
    config: ApiConfig,
    pool: PgPool,
    customers: CustomerService<S, P>,
}

// Manual impl: a derive would require `S: Clone` and `P: Clone`.
impl<S, P> Clone for AppState<S, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl AppState {
    /// Create the production application state.
    ///
    /// # Arguments
    ///
    /// * `config` - API configuration
    /// * `pool` - `PostgreSQL` connection pool
    ///
    /// # Errors
    ///
    /// Returns an error if the postal code HTTP client cannot be built.
    pub fn new(config: ApiConfig, pool: PgPool) -> Result<Self, PostalCodeError> {
        let postal_codes = ViaCepClient::new(&config.postal_code)?;
        let repository = PgCustomerRepository::new(pool.clone());
        let customers = CustomerService::new(repository, postal_codes);

        Ok(Self::with_service(config, pool, customers))
    }
}

impl<S, P> AppState<S, P> {
    /// Create application state around an already-built customer service.
    #[must_use]
    pub fn with_service(config: ApiConfig, pool: PgPool, customers: CustomerService<S, P>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                customers,
            }),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the customer service.
    #[must_use]
    pub fn customers(&self) -> &CustomerService<S, P> {
        &self.inner.customers
    }
}
