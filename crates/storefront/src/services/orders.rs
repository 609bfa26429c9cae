//! Customer-facing order operations and payment event handling.

use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use malmequer_core::{Email, OrderStatus, PaymentStatus, UserId};

use super::notifications::{Notifier, preferences_for};
use super::payments::{PaymentClient, PaymentError, PaymentEvent};
use crate::db::orders::{lock_order, restore_stock, set_status};
use crate::db::{OrderRepository, RepositoryError};
use crate::models::{Order, OrderWithItems};

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("order not found")]
    NotFound,

    #[error("order can no longer be cancelled")]
    NotCancellable,

    #[error("payment error: {0}")]
    Payment(#[from] PaymentError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Who is asking to see an order.
#[derive(Debug, Clone, Copy)]
pub enum OrderViewer<'a> {
    User(UserId),
    Guest { email: &'a str },
}

/// Whether `viewer` may see `order`.
///
/// Users see their own orders. Guests must supply the email the order was
/// placed with; guest lookups never reveal orders that belong to an account.
#[must_use]
pub fn can_view(order: &Order, viewer: OrderViewer<'_>) -> bool {
    match viewer {
        OrderViewer::User(user_id) => order.user_id == Some(user_id),
        OrderViewer::Guest { email } => {
            order.user_id.is_none()
                && Email::parse(email).is_ok_and(|email| email == order.email)
        }
    }
}

pub struct OrderService<'a> {
    pool: &'a PgPool,
    payments: &'a PaymentClient,
    notifier: &'a Notifier,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        payments: &'a PaymentClient,
        notifier: &'a Notifier,
    ) -> Self {
        Self {
            pool,
            payments,
            notifier,
        }
    }

    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order does not exist or the
    /// viewer may not see it.
    pub async fn get_for(
        &self,
        order_number: &str,
        viewer: OrderViewer<'_>,
    ) -> Result<OrderWithItems, OrderError> {
        let order = OrderRepository::new(self.pool)
            .get_with_items(order_number)
            .await?
            .ok_or(OrderError::NotFound)?;
        if !can_view(&order.order, viewer) {
            return Err(OrderError::NotFound);
        }
        Ok(order)
    }

    /// Cancel one of the user's orders.
    ///
    /// Paid orders are refunded before the cancellation is committed; stock
    /// is returned in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotCancellable` once the order is past
    /// `CONFIRMED`, and `OrderError::Payment` if the refund is refused.
    #[instrument(skip(self))]
    pub async fn cancel(
        &self,
        user_id: UserId,
        order_number: &str,
    ) -> Result<OrderWithItems, OrderError> {
        let repo = OrderRepository::new(self.pool);
        let existing = repo
            .get_by_number(order_number)
            .await?
            .filter(|o| o.user_id == Some(user_id))
            .ok_or(OrderError::NotFound)?;

        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;
        let order = lock_order(&mut *tx, existing.id)
            .await?
            .ok_or(OrderError::NotFound)?;
        if !order.status.is_customer_cancellable() {
            return Err(OrderError::NotCancellable);
        }

        let refunded = match (order.payment_status, order.payment_intent_id.as_deref()) {
            (PaymentStatus::Paid, Some(intent)) => {
                let refund = self.payments.refund(intent).await?;
                tracing::info!(order_number, refund_id = %refund.id, "Refund requested");
                true
            }
            _ => false,
        };

        restore_stock(&mut *tx, order.id).await?;
        let payment_status = refunded.then_some(PaymentStatus::Refunded);
        let cancelled =
            set_status(&mut *tx, order.id, OrderStatus::Cancelled, payment_status).await?;
        tx.commit().await.map_err(RepositoryError::from)?;
        tracing::info!(order_number, refunded, "Order cancelled by customer");

        let items = repo.items(cancelled.id).await?;
        let result = OrderWithItems {
            order: cancelled,
            items,
        };
        let prefs = preferences_for(self.pool, Some(user_id)).await;
        self.notifier.order_status(&result, prefs.as_ref(), refunded).await;
        Ok(result)
    }

    /// Apply a verified payment event.
    ///
    /// Returns the order number the event applied to, if any.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the order cannot be updated.
    #[instrument(skip(self))]
    pub async fn apply_payment_event(
        &self,
        event: PaymentEvent,
    ) -> Result<Option<String>, OrderError> {
        let repo = OrderRepository::new(self.pool);
        match event {
            PaymentEvent::Succeeded { payment_intent_id } => {
                let Some(order) = repo.find_by_payment_intent(&payment_intent_id).await? else {
                    tracing::warn!(%payment_intent_id, "Payment succeeded for unknown intent");
                    return Ok(None);
                };
                if order.payment_status == PaymentStatus::Paid {
                    return Ok(Some(order.order_number));
                }

                let paid = repo.mark_paid(order.id).await?;
                tracing::info!(order_number = %paid.order_number, "Payment received");
                let items = repo.items(paid.id).await?;
                let with_items = OrderWithItems { order: paid, items };
                let prefs = preferences_for(self.pool, with_items.order.user_id).await;
                self.notifier
                    .order_confirmation(&with_items, prefs.as_ref())
                    .await;
                Ok(Some(with_items.order.order_number))
            }
            PaymentEvent::Failed { payment_intent_id } => {
                let Some(order) = repo.find_by_payment_intent(&payment_intent_id).await? else {
                    tracing::warn!(%payment_intent_id, "Payment failed for unknown intent");
                    return Ok(None);
                };
                if order.payment_status == PaymentStatus::Pending {
                    repo.set_payment_status(order.id, PaymentStatus::Failed).await?;
                    tracing::info!(order_number = %order.order_number, "Payment failed");
                }
                Ok(Some(order.order_number))
            }
            PaymentEvent::Ignored { kind } => {
                tracing::debug!(%kind, "Ignoring payment event");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ShippingAddress;
    use chrono::Utc;
    use malmequer_core::OrderId;
    use rust_decimal::Decimal;

    fn order(user_id: Option<UserId>) -> Order {
        Order {
            id: OrderId::new(1),
            order_number: "MQ-20250301-K3Z9QX".to_string(),
            user_id,
            email: Email::parse("ana@example.pt").unwrap(),
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_intent_id: None,
            subtotal: Decimal::new(1000, 2),
            tax: Decimal::new(230, 2),
            shipping: Decimal::new(499, 2),
            discount: Decimal::ZERO,
            total: Decimal::new(1729, 2),
            promo_code: None,
            shipping_address: ShippingAddress {
                full_name: "Ana Sousa".to_string(),
                line1: "Rua das Flores 12".to_string(),
                line2: None,
                city: "Porto".to_string(),
                postal_code: "4050-262".to_string(),
                country: "PT".to_string(),
                phone: None,
            },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_owner_can_view() {
        let o = order(Some(UserId::new(5)));
        assert!(can_view(&o, OrderViewer::User(UserId::new(5))));
        assert!(!can_view(&o, OrderViewer::User(UserId::new(6))));
    }

    #[test]
    fn test_guest_needs_matching_email() {
        let o = order(None);
        assert!(can_view(&o, OrderViewer::Guest { email: " ANA@example.pt " }));
        assert!(!can_view(&o, OrderViewer::Guest { email: "other@example.pt" }));
        assert!(!can_view(&o, OrderViewer::Guest { email: "not an email" }));
    }

    #[test]
    fn test_guest_cannot_view_account_orders() {
        let o = order(Some(UserId::new(5)));
        assert!(!can_view(&o, OrderViewer::Guest { email: "ana@example.pt" }));
    }
}
