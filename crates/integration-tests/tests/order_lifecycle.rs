//! Order lifecycle as the back office drives it: status moves, manual
//! payment and which changes reach the customer's inbox.

use malmequer_admin::services::orders::{
    check_payable, check_status_change, check_transition, payment_status_for, restocks,
};
use malmequer_admin::services::OrderAdminError;
use malmequer_core::notifications::{NotificationKind, NotificationPreferences, should_send};
use malmequer_core::{OrderStatus, PaymentStatus};
use malmequer_storefront::services::notifications::announces;

#[test]
fn test_happy_path_to_delivery() {
    let path = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ];
    for step in path.windows(2) {
        assert!(check_transition(step[0], step[1]).is_ok(), "{} -> {}", step[0], step[1]);
    }
}

#[test]
fn test_no_way_back_and_no_way_out_of_terminal_states() {
    assert!(matches!(
        check_transition(OrderStatus::Shipped, OrderStatus::Processing),
        Err(OrderAdminError::InvalidTransition { .. })
    ));
    for terminal in [OrderStatus::Cancelled, OrderStatus::Refunded] {
        assert!(terminal.next_statuses().is_empty());
        for next in OrderStatus::ALL {
            assert!(check_transition(terminal, next).is_err());
        }
    }
}

#[test]
fn test_cancel_only_before_shipping() {
    assert!(check_transition(OrderStatus::Processing, OrderStatus::Cancelled).is_ok());
    assert!(check_transition(OrderStatus::Shipped, OrderStatus::Cancelled).is_err());
    assert!(check_transition(OrderStatus::Delivered, OrderStatus::Cancelled).is_err());
}

#[test]
fn test_same_status_is_not_a_transition() {
    for status in OrderStatus::ALL {
        assert!(check_transition(status, status).is_err());
    }
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
fn test_paid_order_goes_to_refunded_not_cancelled() {
    // Cancelled is terminal: a paid order cancelled here could never be refunded.
    assert!(matches!(
        check_status_change(OrderStatus::Processing, OrderStatus::Cancelled, PaymentStatus::Paid),
        Err(OrderAdminError::RefundRequired)
    ));
    assert_eq!(payment_status_for(OrderStatus::Cancelled, PaymentStatus::Paid), None);

    check_status_change(OrderStatus::Processing, OrderStatus::Refunded, PaymentStatus::Paid)
        .unwrap();
    assert_eq!(
        payment_status_for(OrderStatus::Refunded, PaymentStatus::Paid),
        Some(PaymentStatus::Refunded)
    );
    // Nothing has shipped yet, so the items go back on the shelf.
    assert!(restocks(OrderStatus::Processing, OrderStatus::Refunded));

    // Unpaid orders still cancel as before.
    check_status_change(OrderStatus::Confirmed, OrderStatus::Cancelled, PaymentStatus::Pending)
        .unwrap();
    assert!(restocks(OrderStatus::Confirmed, OrderStatus::Cancelled));
}

#[test]
fn test_manual_payment_rules() {
    assert!(check_payable(OrderStatus::Pending, PaymentStatus::Pending).is_ok());
    assert!(check_payable(OrderStatus::Confirmed, PaymentStatus::Failed).is_ok());
    assert!(matches!(
        check_payable(OrderStatus::Confirmed, PaymentStatus::Paid),
        Err(OrderAdminError::AlreadyPaid)
    ));
    assert!(matches!(
        check_payable(OrderStatus::Cancelled, PaymentStatus::Pending),
        Err(OrderAdminError::NotPayable(OrderStatus::Cancelled))
    ));
}

#[test]
fn test_status_emails_respect_preferences() {
    // Every admin-driven move lands on a status worth announcing.
    for status in OrderStatus::ALL {
        if status != OrderStatus::Pending {
            assert!(announces(status));
        }
    }
    assert!(!announces(OrderStatus::Pending));

    let defaults = NotificationPreferences::default();
    let muted = NotificationPreferences {
        order_updates: false,
        ..defaults
    };
    assert!(should_send(Some(&defaults), NotificationKind::OrderStatusUpdate));
    assert!(!should_send(Some(&muted), NotificationKind::OrderStatusUpdate));

    // Guest checkouts still hear about their order, never about promotions.
    assert!(should_send(None, NotificationKind::OrderConfirmation));
    assert!(should_send(None, NotificationKind::OrderStatusUpdate));
    assert!(!should_send(None, NotificationKind::Promotion));
    assert!(!should_send(None, NotificationKind::Newsletter));
}
