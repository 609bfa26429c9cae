//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::cache::StoreCache;
use crate::config::StorefrontConfig;
use crate::services::email::{EmailSender, LogEmailSender, SmtpEmailSender};
use crate::services::notifications::Notifier;
use crate::services::payments::{PaymentClient, PaymentError};

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("payment client: {0}")]
    Payments(#[from] PaymentError),
    #[error("smtp: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    cache: StoreCache,
    payments: PaymentClient,
    notifier: Notifier,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Email is logged rather than sent when SMTP is not configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the payment client or SMTP transport cannot be built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let payments = PaymentClient::new(&config.payments)?;
        let sender: Arc<dyn EmailSender> = match &config.email {
            Some(email) => Arc::new(SmtpEmailSender::new(email)?),
            None => {
                tracing::warn!("SMTP_HOST not set, customer email will only be logged");
                Arc::new(LogEmailSender)
            }
        };
        Ok(Self::with_parts(config, pool, payments, sender))
    }

    /// Assemble state from already-built parts.
    #[must_use]
    pub fn with_parts(
        config: StorefrontConfig,
        pool: PgPool,
        payments: PaymentClient,
        sender: Arc<dyn EmailSender>,
    ) -> Self {
        let notifier = Notifier::new(sender, config.base_url.clone(), config.shop.currency);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                cache: StoreCache::new(),
                payments,
                notifier,
            }),
        }
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
    pub fn cache(&self) -> &StoreCache {
        &self.inner.cache
    }

    #[must_use]
    pub fn payments(&self) -> &PaymentClient {
        &self.inner.payments
    }

    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }
}
