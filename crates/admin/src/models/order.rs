//! Order list types for the back office.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use malmequer_core::{OrderId, OrderStatus, PaymentStatus};

use super::page_window;

/// Order listing filters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    /// Matches order number or customer email.
    pub q: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl OrderListQuery {
    /// `(page, per_page, offset)`.
    #[must_use]
    pub fn window(&self) -> (u32, u32, i64) {
        page_window(self.page, self.per_page)
    }

    #[must_use]
    pub fn search(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

/// A row of the admin order table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderListItem {
    pub id: OrderId,
    pub order_number: String,
    pub email: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total: Decimal,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_parse_from_query_values() {
        let query: OrderListQuery = serde_json::from_str(
            r#"{"status":"SHIPPED","payment_status":"PAID","q":"  MQ-2026  ","page":2}"#,
        )
        .unwrap();
        assert_eq!(query.status, Some(OrderStatus::Shipped));
        assert_eq!(query.payment_status, Some(PaymentStatus::Paid));
        assert_eq!(query.search(), Some("MQ-2026"));
        assert_eq!(query.window(), (2, 25, 25));
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let query = OrderListQuery {
            q: Some("   ".to_string()),
            ..OrderListQuery::default()
        };
        assert_eq!(query.search(), None);
    }
}
