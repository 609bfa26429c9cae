//! Back-office order operations: status changes and manual payment.
//!
//! Both run in a transaction over the locked order row, then record an
//! activity log entry and tell the customer (subject to their notification
//! settings). Neither the log nor the email can fail the request once the
//! change is committed.

use serde_json::json;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use malmequer_core::{OrderStatus, PaymentStatus};
use malmequer_storefront::db::OrderRepository;
use malmequer_storefront::db::orders::{lock_order, restore_stock, set_status};
use malmequer_storefront::models::OrderWithItems;
use malmequer_storefront::services::notifications::{Notifier, announces, preferences_for};

use super::activity;
use crate::db::RepositoryError;
use crate::models::{CurrentAdmin, actions};

#[derive(Debug, Error)]
pub enum OrderAdminError {
    #[error("order not found")]
    NotFound,

    #[error("cannot move an order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("a paid order must be refunded, not cancelled")]
    RefundRequired,

    #[error("order is already paid")]
    AlreadyPaid,

    #[error("a {0} order cannot take a payment")]
    NotPayable(OrderStatus),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<malmequer_storefront::db::RepositoryError> for OrderAdminError {
    fn from(err: malmequer_storefront::db::RepositoryError) -> Self {
        Self::Repository(err.into())
    }
}

impl From<sqlx::Error> for OrderAdminError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(err.into())
    }
}

/// Check a status change against the order status transition table.
///
/// # Errors
///
/// Returns `OrderAdminError::InvalidTransition` for any move the table does
/// not allow, including "moving" to the current status.
pub const fn check_transition(from: OrderStatus, to: OrderStatus) -> Result<(), OrderAdminError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(OrderAdminError::InvalidTransition { from, to })
    }
}

/// Check a status change against the transition table and the payment.
///
/// A paid order cannot be cancelled: cancelling is terminal, so the money
/// could never be returned afterwards. It has to go to `REFUNDED` instead.
///
/// # Errors
///
/// Returns `OrderAdminError::InvalidTransition` or
/// `OrderAdminError::RefundRequired`.
pub fn check_status_change(
    from: OrderStatus,
    to: OrderStatus,
    payment: PaymentStatus,
) -> Result<(), OrderAdminError> {
    check_transition(from, to)?;
    if matches!(to, OrderStatus::Cancelled) && matches!(payment, PaymentStatus::Paid) {
        return Err(OrderAdminError::RefundRequired);
    }
    Ok(())
}

/// Whether moving `from` → `to` puts the order's items back into stock.
///
/// Items leave the warehouse at `SHIPPED`; before that, cancelling or
/// refunding returns them.
#[must_use]
pub const fn restocks(from: OrderStatus, to: OrderStatus) -> bool {
    matches!(to, OrderStatus::Cancelled | OrderStatus::Refunded)
        && matches!(
            from,
            OrderStatus::Pending | OrderStatus::Confirmed | OrderStatus::Processing
        )
}

/// Payment status that goes with a new order status, if it changes.
#[must_use]
pub const fn payment_status_for(to: OrderStatus, current: PaymentStatus) -> Option<PaymentStatus> {
    match (to, current) {
        (OrderStatus::Refunded, PaymentStatus::Paid) => Some(PaymentStatus::Refunded),
        _ => None,
    }
}

/// Whether a manual payment may be accepted in the current state.
///
/// # Errors
///
/// Returns `OrderAdminError::AlreadyPaid` or `OrderAdminError::NotPayable`.
pub const fn check_payable(
    status: OrderStatus,
    payment: PaymentStatus,
) -> Result<(), OrderAdminError> {
    if matches!(payment, PaymentStatus::Paid) {
        return Err(OrderAdminError::AlreadyPaid);
    }
    if status.is_terminal() || matches!(payment, PaymentStatus::Refunded) {
        return Err(OrderAdminError::NotPayable(status));
    }
    Ok(())
}

pub struct AdminOrderService<'a> {
    pool: &'a PgPool,
    notifier: &'a Notifier,
}

impl<'a> AdminOrderService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, notifier: &'a Notifier) -> Self {
        Self { pool, notifier }
    }

    /// # Errors
    ///
    /// Returns `OrderAdminError::NotFound` if there is no such order.
    pub async fn get(&self, order_number: &str) -> Result<OrderWithItems, OrderAdminError> {
        OrderRepository::new(self.pool)
            .get_with_items(order_number)
            .await?
            .ok_or(OrderAdminError::NotFound)
    }

    /// Move an order to `status`.
    ///
    /// Cancelling, or refunding before shipping, puts the order's items back
    /// into stock in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `OrderAdminError::InvalidTransition` if the transition table
    /// does not allow the move, and `OrderAdminError::RefundRequired` when
    /// cancelling a paid order.
    #[instrument(skip(self, admin), fields(admin_id = %admin.id))]
    pub async fn update_status(
        &self,
        admin: &CurrentAdmin,
        order_number: &str,
        status: OrderStatus,
    ) -> Result<OrderWithItems, OrderAdminError> {
        let repo = OrderRepository::new(self.pool);
        let existing = repo
            .get_by_number(order_number)
            .await?
            .ok_or(OrderAdminError::NotFound)?;

        let mut tx = self.pool.begin().await?;
        let order = lock_order(&mut *tx, existing.id)
            .await?
            .ok_or(OrderAdminError::NotFound)?;
        let previous = order.status;
        check_status_change(previous, status, order.payment_status)?;

        let restocked = if restocks(previous, status) {
            restore_stock(&mut *tx, order.id).await?
        } else {
            0
        };
        let payment_status = payment_status_for(status, order.payment_status);
        let updated = set_status(&mut *tx, order.id, status, payment_status).await?;
        tx.commit().await?;
        tracing::info!(
            order_number,
            from = %previous,
            to = %status,
            restocked,
            "Order status changed"
        );

        activity::record(
            self.pool,
            admin,
            actions::ORDER_STATUS,
            "order",
            Some(updated.order_number.clone()),
            json!({ "from": previous, "to": status, "restocked_items": restocked }),
        )
        .await;

        let items = repo.items(updated.id).await?;
        let result = OrderWithItems { order: updated, items };
        if announces(status) {
            let prefs = preferences_for(self.pool, result.order.user_id).await;
            let refunded = result.order.payment_status == PaymentStatus::Refunded;
            self.notifier.order_status(&result, prefs.as_ref(), refunded).await;
        }
        Ok(result)
    }

    /// Record a payment received outside the processor (bank transfer, cash).
    ///
    /// The order becomes `PAID`; a `PENDING` order also moves to `CONFIRMED`.
    ///
    /// # Errors
    ///
    /// Returns `OrderAdminError::AlreadyPaid` or `OrderAdminError::NotPayable`
    /// when the order cannot take a payment.
    #[instrument(skip(self, admin), fields(admin_id = %admin.id))]
    pub async fn accept_payment(
        &self,
        admin: &CurrentAdmin,
        order_number: &str,
    ) -> Result<OrderWithItems, OrderAdminError> {
        let repo = OrderRepository::new(self.pool);
        let existing = repo
            .get_by_number(order_number)
            .await?
            .ok_or(OrderAdminError::NotFound)?;

        let mut tx = self.pool.begin().await?;
        let order = lock_order(&mut *tx, existing.id)
            .await?
            .ok_or(OrderAdminError::NotFound)?;
        check_payable(order.status, order.payment_status)?;

        let status = if order.status == OrderStatus::Pending {
            OrderStatus::Confirmed
        } else {
            order.status
        };
        let paid = set_status(&mut *tx, order.id, status, Some(PaymentStatus::Paid)).await?;
        tx.commit().await?;
        tracing::info!(order_number, "Payment accepted manually");

        activity::record(
            self.pool,
            admin,
            actions::PAYMENT_MANUAL_ACCEPT,
            "order",
            Some(paid.order_number.clone()),
            json!({
                "previous_payment_status": order.payment_status,
                "previous_status": order.status,
                "status": paid.status,
                "total": paid.total,
            }),
        )
        .await;

        let items = repo.items(paid.id).await?;
        let result = OrderWithItems { order: paid, items };
        if order.status != result.order.status {
            let prefs = preferences_for(self.pool, result.order.user_id).await;
            self.notifier.order_confirmation(&result, prefs.as_ref()).await;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_guard() {
        assert!(check_transition(OrderStatus::Pending, OrderStatus::Confirmed).is_ok());
        assert!(check_transition(OrderStatus::Shipped, OrderStatus::Delivered).is_ok());
        assert!(matches!(
            check_transition(OrderStatus::Delivered, OrderStatus::Pending),
            Err(OrderAdminError::InvalidTransition { .. })
        ));
        assert!(check_transition(OrderStatus::Shipped, OrderStatus::Shipped).is_err());
        assert!(check_transition(OrderStatus::Cancelled, OrderStatus::Confirmed).is_err());
    }

    #[test]
    fn test_invalid_transition_message_names_both_statuses() {
        let err = check_transition(OrderStatus::Shipped, OrderStatus::Cancelled).unwrap_err();
        assert_eq!(err.to_string(), "cannot move an order from SHIPPED to CANCELLED");
    }

    #[test]
    fn test_refund_marks_paid_orders_refunded() {
        assert_eq!(
            payment_status_for(OrderStatus::Refunded, PaymentStatus::Paid),
            Some(PaymentStatus::Refunded)
        );
        assert_eq!(payment_status_for(OrderStatus::Refunded, PaymentStatus::Pending), None);
        assert_eq!(payment_status_for(OrderStatus::Shipped, PaymentStatus::Paid), None);
    }

    #[test]
    fn test_paid_orders_cannot_be_cancelled() {
        assert_eq!(payment_status_for(OrderStatus::Cancelled, PaymentStatus::Paid), None);
        let paid = PaymentStatus::Paid;
        assert!(matches!(
            check_status_change(OrderStatus::Confirmed, OrderStatus::Cancelled, paid),
            Err(OrderAdminError::RefundRequired)
        ));
        assert!(check_status_change(OrderStatus::Confirmed, OrderStatus::Refunded, paid).is_ok());
        for payment in [PaymentStatus::Pending, PaymentStatus::Failed] {
            let change = check_status_change(OrderStatus::Pending, OrderStatus::Cancelled, payment);
            assert!(change.is_ok());
        }
        // The table is checked first.
        assert!(matches!(
            check_status_change(OrderStatus::Shipped, OrderStatus::Cancelled, paid),
            Err(OrderAdminError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_restock_only_before_shipping() {
        assert!(restocks(OrderStatus::Pending, OrderStatus::Cancelled));
        assert!(restocks(OrderStatus::Processing, OrderStatus::Refunded));
        assert!(!restocks(OrderStatus::Shipped, OrderStatus::Refunded));
        assert!(!restocks(OrderStatus::Delivered, OrderStatus::Refunded));
        assert!(!restocks(OrderStatus::Confirmed, OrderStatus::Processing));
    }

    #[test]
    fn test_payable_states() {
        assert!(check_payable(OrderStatus::Pending, PaymentStatus::Pending).is_ok());
        assert!(check_payable(OrderStatus::Pending, PaymentStatus::Failed).is_ok());
        assert!(matches!(
            check_payable(OrderStatus::Confirmed, PaymentStatus::Paid),
            Err(OrderAdminError::AlreadyPaid)
        ));
        assert!(matches!(
            check_payable(OrderStatus::Cancelled, PaymentStatus::Pending),
            Err(OrderAdminError::NotPayable(OrderStatus::Cancelled))
        ));
    }
}
