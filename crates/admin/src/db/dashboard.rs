//! Dashboard counters.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use super::RepositoryError;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DashboardStats {
    pub orders_today: i64,
    /// Order totals over the last 30 days, cancelled and refunded excluded.
    pub revenue_30d: Decimal,
    pub pending_orders: i64,
    pub low_stock_items: i64,
    pub customers: i64,
    /// Products that are not archived.
    pub products: i64,
}

pub struct DashboardRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DashboardRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stats(&self, low_stock_threshold: i32) -> Result<DashboardStats, RepositoryError> {
        let stats = sqlx::query_as::<_, DashboardStats>(
            r"
            SELECT
                (SELECT COUNT(*) FROM shop.order
                 WHERE created_at >= date_trunc('day', now())) AS orders_today,
                (SELECT COALESCE(SUM(total), 0) FROM shop.order
                 WHERE created_at >= now() - interval '30 days'
                   AND status NOT IN ('CANCELLED', 'REFUNDED')) AS revenue_30d,
                (SELECT COUNT(*) FROM shop.order WHERE status = 'PENDING') AS pending_orders,
                (SELECT COUNT(*) FROM shop.stock_item si
                 JOIN shop.product p ON p.id = si.product_id
                 WHERE si.quantity <= $1 AND p.status <> 'ARCHIVED') AS low_stock_items,
                (SELECT COUNT(*) FROM shop.user) AS customers,
                (SELECT COUNT(*) FROM shop.product WHERE status <> 'ARCHIVED') AS products
            ",
        )
        .bind(low_stock_threshold)
        .fetch_one(self.pool)
        .await?;

        Ok(stats)
    }
}
