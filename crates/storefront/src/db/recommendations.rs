//! Sales aggregates that feed product recommendations.
//!
//! Cancelled orders never count as sales.

use sqlx::PgPool;

use malmequer_core::ProductId;

use super::RepositoryError;

/// Units sold of one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct ProductSales {
    pub product_id: ProductId,
    pub units: i64,
}

/// Units sold of one product in the recent and baseline windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct SalesWindow {
    pub product_id: ProductId,
    pub recent_units: i64,
    pub baseline_units: i64,
}

/// How many orders contained both the anchor product and this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct CoPurchase {
    pub product_id: ProductId,
    pub orders: i64,
}

/// Days in the recent sales window.
pub const RECENT_DAYS: i32 = 7;
/// Days in the baseline window that precedes the recent one.
pub const BASELINE_DAYS: i32 = 21;

pub struct RecommendationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RecommendationRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All-time units sold per visible product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn units_sold(&self) -> Result<Vec<ProductSales>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductSales>(
            r"
            SELECT oi.product_id, SUM(oi.quantity)::bigint AS units
            FROM shop.order_item oi
            JOIN shop.order o ON o.id = oi.order_id
            JOIN shop.product p ON p.id = oi.product_id
            WHERE o.status <> 'CANCELLED' AND p.status = 'ACTIVE'
            GROUP BY oi.product_id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Units per visible product over the last `RECENT_DAYS` days and the
    /// `BASELINE_DAYS` days before that.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn sales_windows(&self) -> Result<Vec<SalesWindow>, RepositoryError> {
        let rows = sqlx::query_as::<_, SalesWindow>(
            r"
            SELECT oi.product_id,
                   COALESCE(SUM(oi.quantity) FILTER (
                       WHERE o.created_at >= now() - make_interval(days => $1)
                   ), 0)::bigint AS recent_units,
                   COALESCE(SUM(oi.quantity) FILTER (
                       WHERE o.created_at < now() - make_interval(days => $1)
                   ), 0)::bigint AS baseline_units
            FROM shop.order_item oi
            JOIN shop.order o ON o.id = oi.order_id
            JOIN shop.product p ON p.id = oi.product_id
            WHERE o.status <> 'CANCELLED'
              AND p.status = 'ACTIVE'
              AND o.created_at >= now() - make_interval(days => $1 + $2)
            GROUP BY oi.product_id
            ",
        )
        .bind(RECENT_DAYS)
        .bind(BASELINE_DAYS)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Other visible products bought in the same orders as `product_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn bought_together(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<CoPurchase>, RepositoryError> {
        let rows = sqlx::query_as::<_, CoPurchase>(
            r"
            SELECT other.product_id, COUNT(DISTINCT other.order_id)::bigint AS orders
            FROM shop.order_item anchor
            JOIN shop.order o ON o.id = anchor.order_id
            JOIN shop.order_item other
              ON other.order_id = anchor.order_id AND other.product_id <> anchor.product_id
            JOIN shop.product p ON p.id = other.product_id
            WHERE anchor.product_id = $1
              AND o.status <> 'CANCELLED'
              AND p.status = 'ACTIVE'
            GROUP BY other.product_id
            ",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}
