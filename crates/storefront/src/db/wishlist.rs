//! Wishlist storage for users and guests.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use malmequer_core::{ProductId, UserId, WishlistItemId};

use super::RepositoryError;
use crate::models::{CartOwner, ProductSummary, WishlistEntry};

#[derive(sqlx::FromRow)]
struct WishlistRow {
    id: WishlistItemId,
    added_at: DateTime<Utc>,
    product_id: ProductId,
    name: String,
    slug: String,
    price: Decimal,
    compare_at_price: Option<Decimal>,
    image_url: Option<String>,
    featured: bool,
    category_slug: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<WishlistRow> for WishlistEntry {
    fn from(r: WishlistRow) -> Self {
        Self {
            id: r.id,
            added_at: r.added_at,
            product: ProductSummary {
                id: r.product_id,
                name: r.name,
                slug: r.slug,
                price: r.price,
                compare_at_price: r.compare_at_price,
                image_url: r.image_url,
                featured: r.featured,
                category_slug: r.category_slug,
                created_at: r.created_at,
            },
        }
    }
}

pub struct WishlistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Wishlist entries, most recently added first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, owner: CartOwner) -> Result<Vec<WishlistEntry>, RepositoryError> {
        let rows = sqlx::query_as::<_, WishlistRow>(
            r"
            SELECT w.id, w.created_at AS added_at,
                   p.id AS product_id, p.name, p.slug, p.price, p.compare_at_price,
                   p.image_url, p.featured, c.slug AS category_slug, p.created_at
            FROM shop.wishlist_item w
            JOIN shop.product p ON p.id = w.product_id
            LEFT JOIN shop.category c ON c.id = p.category_id
            WHERE (w.user_id = $1 OR w.guest_id = $2) AND p.status = 'ACTIVE'
            ORDER BY w.created_at DESC, w.id DESC
            ",
        )
        .bind(owner.user_id())
        .bind(owner.guest_id())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(WishlistEntry::from).collect())
    }

    /// Add a product; adding it twice is a no-op.
    ///
    /// Returns `true` if a new entry was created.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn add(
        &self,
        owner: CartOwner,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO shop.wishlist_item (user_id, guest_id, product_id)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(owner.user_id())
        .bind(owner.guest_id())
        .bind(product_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove(
        &self,
        owner: CartOwner,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM shop.wishlist_item
            WHERE (user_id = $1 OR guest_id = $2) AND product_id = $3
            ",
        )
        .bind(owner.user_id())
        .bind(owner.guest_id())
        .bind(product_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Move a guest's wishlist to a user, dropping products the user already saved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a statement fails.
    pub async fn merge_guest(
        &self,
        guest_id: Uuid,
        user_id: UserId,
    ) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let moved = sqlx::query(
            r"
            INSERT INTO shop.wishlist_item (user_id, product_id, created_at)
            SELECT $1, product_id, created_at
            FROM shop.wishlist_item
            WHERE guest_id = $2
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(user_id)
        .bind(guest_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query("DELETE FROM shop.wishlist_item WHERE guest_id = $1")
            .bind(guest_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(moved)
    }
}
