//! Order listing for the back office.
//!
//! Single orders, status changes and payment updates go through the
//! storefront's order storage in `malmequer_storefront::db::orders`.

use sqlx::PgPool;

use malmequer_storefront::db::catalog::contains_pattern;
use malmequer_storefront::models::Page;

use super::RepositoryError;
use crate::models::{OrderListItem, OrderListQuery};

const LIST_WHERE: &str = r"
    ($1::shop.order_status IS NULL OR o.status = $1)
    AND ($2::shop.payment_status IS NULL OR o.payment_status = $2)
    AND ($3::text IS NULL OR o.order_number ILIKE $3 OR o.email ILIKE $3)
";

pub struct AdminOrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AdminOrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Orders newest first, filtered by status, payment status and a search
    /// over order number and email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        query: &OrderListQuery,
    ) -> Result<Page<OrderListItem>, RepositoryError> {
        let (page, per_page, offset) = query.window();
        let pattern = query.search().map(contains_pattern);

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM shop.order o WHERE {LIST_WHERE}"
        ))
        .bind(query.status)
        .bind(query.payment_status)
        .bind(pattern.as_deref())
        .fetch_one(self.pool)
        .await?;

        let items = sqlx::query_as::<_, OrderListItem>(&format!(
            r"
            SELECT o.id, o.order_number, o.email, o.status, o.payment_status, o.total,
                   COALESCE((SELECT SUM(oi.quantity) FROM shop.order_item oi
                             WHERE oi.order_id = o.id), 0)::bigint AS item_count,
                   o.created_at
            FROM shop.order o
            WHERE {LIST_WHERE}
            ORDER BY o.created_at DESC, o.id DESC
            LIMIT $4 OFFSET $5
            "
        ))
        .bind(query.status)
        .bind(query.payment_status)
        .bind(pattern.as_deref())
        .bind(i64::from(per_page))
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok(Page::new(items, page, per_page, total))
    }
}
