//! Customer notifications gated by preferences.
//!
//! Sends never fail the request that triggered them: skipped sends are logged
//! at debug level and delivery failures at warn.

use std::sync::Arc;

use sqlx::PgPool;

use malmequer_core::notifications::{NotificationKind, NotificationPreferences, should_send};
use malmequer_core::{CurrencyCode, OrderStatus, UserId};

use super::email::{
    EmailMessage, EmailOrder, EmailSender, order_confirmation_email, order_status_email,
    welcome_email,
};
use crate::db::NotificationSettingsRepository;
use crate::models::{OrderWithItems, User};

/// Renders and sends customer email.
#[derive(Clone)]
pub struct Notifier {
    sender: Arc<dyn EmailSender>,
    base_url: String,
    currency: CurrencyCode,
}

impl Notifier {
    #[must_use]
    pub fn new(
        sender: Arc<dyn EmailSender>,
        base_url: impl Into<String>,
        currency: CurrencyCode,
    ) -> Self {
        Self {
            sender,
            base_url: base_url.into(),
            currency,
        }
    }

    pub async fn welcome(&self, user: &User) {
        let name = user.name.as_deref().unwrap_or("there");
        self.deliver(
            None,
            NotificationKind::Welcome,
            welcome_email(user.email.as_str(), name, &self.base_url),
        )
        .await;
    }

    pub async fn order_confirmation(
        &self,
        order: &OrderWithItems,
        preferences: Option<&NotificationPreferences>,
    ) {
        let view = EmailOrder::new(order, self.currency, &self.base_url);
        self.deliver(
            preferences,
            NotificationKind::OrderConfirmation,
            order_confirmation_email(order.order.email.as_str(), &view),
        )
        .await;
    }

    pub async fn order_status(
        &self,
        order: &OrderWithItems,
        preferences: Option<&NotificationPreferences>,
        refunded: bool,
    ) {
        let view = EmailOrder::new(order, self.currency, &self.base_url);
        self.deliver(
            preferences,
            NotificationKind::OrderStatusUpdate,
            order_status_email(order.order.email.as_str(), &view, order.order.status, refunded),
        )
        .await;
    }

    /// Send a rendered message if the recipient's preferences allow `kind`.
    ///
    /// Returns whether the message was handed to the sender successfully.
    pub async fn deliver(
        &self,
        preferences: Option<&NotificationPreferences>,
        kind: NotificationKind,
        message: Result<EmailMessage, super::email::EmailError>,
    ) -> bool {
        if !should_send(preferences, kind) {
            tracing::debug!(?kind, "Notification skipped by preferences");
            return false;
        }
        let message = match message {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(?kind, error = %e, "Failed to render notification");
                return false;
            }
        };
        match self.sender.send(message).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(?kind, error = %e, "Failed to send notification");
                false
            }
        }
    }
}

/// Stored preferences for an order's customer; guests have none.
///
/// A lookup failure is logged and treated as "no stored preferences".
pub async fn preferences_for(
    pool: &PgPool,
    user_id: Option<UserId>,
) -> Option<NotificationPreferences> {
    let user_id = user_id?;
    match NotificationSettingsRepository::new(pool).get(user_id).await {
        Ok(Some(prefs)) => Some(prefs),
        Ok(None) => Some(NotificationPreferences::default()),
        Err(e) => {
            tracing::warn!(user_id = %user_id, error = %e, "Failed to load notification settings");
            None
        }
    }
}

/// Whether a status change is worth telling the customer about.
#[must_use]
pub const fn announces(status: OrderStatus) -> bool {
    !matches!(status, OrderStatus::Pending)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::email::EmailError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<EmailMessage>>,
        fail: bool,
    }

    #[async_trait]
    impl EmailSender for RecordingSender {
        async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
            if self.fail {
                return Err(EmailError::InvalidAddress(message.to));
            }
            self.sent.lock().unwrap().push(message);
            Ok(())
        }
    }

    fn message() -> Result<EmailMessage, EmailError> {
        Ok(EmailMessage {
            to: "ana@example.pt".to_string(),
            subject: "Order MQ-20250301-K3Z9QX confirmed".to_string(),
            text: "text".to_string(),
            html: "<p>html</p>".to_string(),
        })
    }

    #[tokio::test]
    async fn test_guest_receives_order_mail() {
        let sender = Arc::new(RecordingSender::default());
        let notifier = Notifier::new(sender.clone(), "https://shop.example", CurrencyCode::EUR);

        assert!(notifier.deliver(None, NotificationKind::OrderConfirmation, message()).await);
        assert_eq!(sender.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_opted_out_user_is_skipped() {
        let sender = Arc::new(RecordingSender::default());
        let notifier = Notifier::new(sender.clone(), "https://shop.example", CurrencyCode::EUR);
        let prefs = NotificationPreferences {
            order_updates: false,
            ..NotificationPreferences::default()
        };

        assert!(
            !notifier
                .deliver(Some(&prefs), NotificationKind::OrderStatusUpdate, message())
                .await
        );
        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_failure_is_swallowed() {
        let sender = Arc::new(RecordingSender {
            fail: true,
            ..RecordingSender::default()
        });
        let notifier = Notifier::new(sender, "https://shop.example", CurrencyCode::EUR);

        assert!(!notifier.deliver(None, NotificationKind::Welcome, message()).await);
    }

    #[test]
    fn test_pending_is_not_announced() {
        assert!(!announces(OrderStatus::Pending));
        assert!(announces(OrderStatus::Shipped));
        assert!(announces(OrderStatus::Cancelled));
    }
}
