//! Customer notification preferences.

use serde::{Deserialize, Serialize};

/// Kinds of email the store sends to customers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Welcome,
    OrderConfirmation,
    OrderStatusUpdate,
    Promotion,
    Newsletter,
    BackInStock,
}

impl NotificationKind {
    /// Kinds sent about a specific order.
    #[must_use]
    pub const fn is_order_related(self) -> bool {
        matches!(self, Self::OrderConfirmation | Self::OrderStatusUpdate)
    }
}

/// A customer's opt-in flags, one per notification channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationPreferences {
    pub order_updates: bool,
    pub promotions: bool,
    pub newsletter: bool,
    pub back_in_stock: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            order_updates: true,
            promotions: false,
            newsletter: false,
            back_in_stock: false,
        }
    }
}

impl NotificationPreferences {
    /// Whether a notification of `kind` may be sent.
    #[must_use]
    pub const fn allows(&self, kind: NotificationKind) -> bool {
        match kind {
            NotificationKind::Welcome => true,
            NotificationKind::OrderConfirmation | NotificationKind::OrderStatusUpdate => {
                self.order_updates
            }
            NotificationKind::Promotion => self.promotions,
            NotificationKind::Newsletter => self.newsletter,
            NotificationKind::BackInStock => self.back_in_stock,
        }
    }
}

/// Gate for a recipient who may not have an account.
///
/// Guests have no stored preferences and only ever receive order email and
/// the welcome message.
#[must_use]
pub fn should_send(preferences: Option<&NotificationPreferences>, kind: NotificationKind) -> bool {
    preferences.map_or_else(
        || kind.is_order_related() || kind == NotificationKind::Welcome,
        |prefs| prefs.allows(kind),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_allow_order_mail_only() {
        let prefs = NotificationPreferences::default();
        assert!(prefs.allows(NotificationKind::OrderConfirmation));
        assert!(prefs.allows(NotificationKind::OrderStatusUpdate));
        assert!(!prefs.allows(NotificationKind::Promotion));
        assert!(!prefs.allows(NotificationKind::Newsletter));
        assert!(!prefs.allows(NotificationKind::BackInStock));
    }

    #[test]
    fn test_opting_out_of_order_updates() {
        let prefs = NotificationPreferences {
            order_updates: false,
            ..NotificationPreferences::default()
        };
        assert!(!prefs.allows(NotificationKind::OrderStatusUpdate));
        assert!(prefs.allows(NotificationKind::Welcome));
    }

    #[test]
    fn test_guests_get_order_mail() {
        assert!(should_send(None, NotificationKind::OrderConfirmation));
        assert!(should_send(None, NotificationKind::OrderStatusUpdate));
        assert!(!should_send(None, NotificationKind::Promotion));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let prefs: NotificationPreferences =
            serde_json::from_str(r#"{"promotions": true}"#).unwrap_or_default();
        assert!(prefs.order_updates);
        assert!(prefs.promotions);
    }
}
