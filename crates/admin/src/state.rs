//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use malmequer_storefront::services::email::{EmailSender, LogEmailSender, SmtpEmailSender};
use malmequer_storefront::services::notifications::Notifier;

use crate::config::AdminConfig;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: PgPool,
    notifier: Notifier,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Customer email is logged rather than sent when SMTP is not configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP transport cannot be built.
    pub fn new(config: AdminConfig, pool: PgPool) -> Result<Self, lettre::transport::smtp::Error> {
        let sender: Arc<dyn EmailSender> = match &config.email {
            Some(email) => Arc::new(SmtpEmailSender::new(email)?),
            None => {
                tracing::warn!("SMTP_HOST not set, customer email will only be logged");
                Arc::new(LogEmailSender)
            }
        };
        Ok(Self::with_sender(config, pool, sender))
    }

    /// Assemble state around an existing email sender.
    #[must_use]
    pub fn with_sender(config: AdminConfig, pool: PgPool, sender: Arc<dyn EmailSender>) -> Self {
        // Links in customer email point at the storefront, not the back office.
        let notifier = Notifier::new(sender, config.storefront_base_url.clone(), config.currency);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                notifier,
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
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }
}
