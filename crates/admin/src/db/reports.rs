//! Raw rows for report generation.
//!
//! Aggregation happens in `services::reports`; these queries only select the
//! rows in range.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use malmequer_core::{OrderId, OrderStatus, PaymentStatus, ProductId, UserId};

use super::RepositoryError;

/// Order header fields used by the sales, customer and financial reports.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReportOrder {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: Option<UserId>,
    pub email: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReportLine {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InventoryRow {
    pub product_name: String,
    pub sku: String,
    pub size_label: Option<String>,
    pub color_name: Option<String>,
    pub quantity: i32,
}

#[derive(Debug, Clone, Copy, Default, sqlx::FromRow)]
pub struct CustomerCounts {
    pub total: i64,
    pub new_in_range: i64,
}

pub struct ReportRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReportRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Orders created in `[from, to)`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn orders(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ReportOrder>, RepositoryError> {
        let orders = sqlx::query_as::<_, ReportOrder>(
            r"
            SELECT id, order_number, user_id, email, status, payment_status,
                   subtotal, discount, tax, shipping, total, created_at
            FROM shop.order
            WHERE created_at >= $1 AND created_at < $2
            ORDER BY created_at, id
            ",
        )
        .bind(from)
        .bind(to)
        .fetch_all(self.pool)
        .await?;

        Ok(orders)
    }

    /// Lines of the orders created in `[from, to)`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ReportLine>, RepositoryError> {
        let lines = sqlx::query_as::<_, ReportLine>(
            r"
            SELECT oi.order_id, oi.product_id, oi.product_name, oi.quantity, oi.line_total
            FROM shop.order_item oi
            JOIN shop.order o ON o.id = oi.order_id
            WHERE o.created_at >= $1 AND o.created_at < $2
            ORDER BY oi.order_id, oi.id
            ",
        )
        .bind(from)
        .bind(to)
        .fetch_all(self.pool)
        .await?;

        Ok(lines)
    }

    /// Every stock item of a non-archived product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn inventory(&self) -> Result<Vec<InventoryRow>, RepositoryError> {
        let rows = sqlx::query_as::<_, InventoryRow>(
            r"
            SELECT p.name AS product_name, si.sku, s.label AS size_label,
                   c.name AS color_name, si.quantity
            FROM shop.stock_item si
            JOIN shop.product p ON p.id = si.product_id
            LEFT JOIN shop.product_size s ON s.id = si.size_id
            LEFT JOIN shop.product_color c ON c.id = si.color_id
            WHERE p.status <> 'ARCHIVED'
            ORDER BY p.name, si.sku
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Registered customers overall and registered in `[from, to)`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn customer_counts(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<CustomerCounts, RepositoryError> {
        let counts = sqlx::query_as::<_, CustomerCounts>(
            r"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE created_at >= $1 AND created_at < $2) AS new_in_range
            FROM shop.user
            ",
        )
        .bind(from)
        .bind(to)
        .fetch_one(self.pool)
        .await?;

        Ok(counts)
    }
}
