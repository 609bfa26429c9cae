//! Cart line storage.
//!
//! Lines belong to either a user or a guest id. Queries take both as
//! nullable parameters and match `user_id = $1 OR guest_id = $2`; exactly one
//! of the two is ever bound.

use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use malmequer_core::{CartItemId, ProductId, StockItemId, UserId};

use super::RepositoryError;
use crate::models::{CartLine, CartOwner, MergeStep};

#[derive(sqlx::FromRow)]
struct CartLineRow {
    id: CartItemId,
    product_id: ProductId,
    product_name: String,
    product_slug: String,
    image_url: Option<String>,
    base_price: Decimal,
    stock_item_id: Option<StockItemId>,
    size_label: Option<String>,
    size_extra: Option<Decimal>,
    color_name: Option<String>,
    color_extra: Option<Decimal>,
    quantity: i32,
    available: Option<i32>,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(r: CartLineRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(r.quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "cart line {} has quantity {}",
                r.id, r.quantity
            ))
        })?;
        Ok(Self {
            id: r.id,
            product_id: r.product_id,
            product_name: r.product_name,
            product_slug: r.product_slug,
            image_url: r.image_url,
            base_price: r.base_price,
            stock_item_id: r.stock_item_id,
            size_label: r.size_label,
            size_extra: r.size_extra,
            color_name: r.color_name,
            color_extra: r.color_extra,
            quantity,
            available: r.available,
        })
    }
}

const fn owner_params(owner: CartOwner) -> (Option<UserId>, Option<Uuid>) {
    (owner.user_id(), owner.guest_id())
}

fn to_db_quantity(quantity: u32) -> Result<i32, RepositoryError> {
    i32::try_from(quantity)
        .map_err(|_| RepositoryError::Conflict(format!("quantity {quantity} is too large")))
}

/// Load an owner's priced cart lines with any executor (pool or transaction).
///
/// Lines whose product is no longer `ACTIVE` are left out.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn fetch_lines<'e, E>(
    executor: E,
    owner: CartOwner,
) -> Result<Vec<CartLine>, RepositoryError>
where
    E: PgExecutor<'e>,
{
    let (user_id, guest_id) = owner_params(owner);
    let rows = sqlx::query_as::<_, CartLineRow>(
        r"
        SELECT ci.id, ci.product_id,
               p.name AS product_name, p.slug AS product_slug, p.image_url,
               p.price AS base_price,
               ci.stock_item_id,
               sz.label AS size_label, sz.price_extra AS size_extra,
               co.name AS color_name, co.price_extra AS color_extra,
               ci.quantity,
               si.quantity AS available
        FROM shop.cart_item ci
        JOIN shop.product p ON p.id = ci.product_id
        LEFT JOIN shop.stock_item si ON si.id = ci.stock_item_id
        LEFT JOIN shop.product_size sz ON sz.id = si.size_id
        LEFT JOIN shop.product_color co ON co.id = si.color_id
        WHERE (ci.user_id = $1 OR ci.guest_id = $2)
          AND p.status = 'ACTIVE'
        ORDER BY ci.created_at, ci.id
        ",
    )
    .bind(user_id)
    .bind(guest_id)
    .fetch_all(executor)
    .await?;

    rows.into_iter().map(CartLine::try_from).collect()
}

/// Delete every line an owner has.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn clear_lines<'e, E>(executor: E, owner: CartOwner) -> Result<u64, RepositoryError>
where
    E: PgExecutor<'e>,
{
    let (user_id, guest_id) = owner_params(owner);
    let result = sqlx::query("DELETE FROM shop.cart_item WHERE user_id = $1 OR guest_id = $2")
        .bind(user_id)
        .bind(guest_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// Repository for cart lines.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines(&self, owner: CartOwner) -> Result<Vec<CartLine>, RepositoryError> {
        fetch_lines(self.pool, owner).await
    }

    /// Add `quantity` to the owner's line for this product/stock item,
    /// creating the line when there is none.
    ///
    /// Returns the line id and its new quantity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn add_quantity(
        &self,
        owner: CartOwner,
        product_id: ProductId,
        stock_item_id: Option<StockItemId>,
        quantity: u32,
    ) -> Result<(CartItemId, i32), RepositoryError> {
        let (user_id, guest_id) = owner_params(owner);
        let quantity = to_db_quantity(quantity)?;
        let mut tx = self.pool.begin().await?;

        let updated: Option<(CartItemId, i32)> = sqlx::query_as(
            r"
            UPDATE shop.cart_item
            SET quantity = quantity + $5, updated_at = now()
            WHERE (user_id = $1 OR guest_id = $2)
              AND product_id = $3
              AND stock_item_id IS NOT DISTINCT FROM $4
            RETURNING id, quantity
            ",
        )
        .bind(user_id)
        .bind(guest_id)
        .bind(product_id)
        .bind(stock_item_id)
        .bind(quantity)
        .fetch_optional(&mut *tx)
        .await?;

        let line = match updated {
            Some(line) => line,
            None => sqlx::query_as(
                r"
                INSERT INTO shop.cart_item (user_id, guest_id, product_id, stock_item_id, quantity)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, quantity
                ",
            )
            .bind(user_id)
            .bind(guest_id)
            .bind(product_id)
            .bind(stock_item_id)
            .bind(quantity)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| RepositoryError::from_unique_violation(e, "cart line"))?,
        };

        tx.commit().await?;
        Ok(line)
    }

    /// Set a line's quantity. Returns `false` if the owner has no such line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_quantity(
        &self,
        owner: CartOwner,
        line_id: CartItemId,
        quantity: u32,
    ) -> Result<bool, RepositoryError> {
        let (user_id, guest_id) = owner_params(owner);
        let result = sqlx::query(
            r"
            UPDATE shop.cart_item
            SET quantity = $4, updated_at = now()
            WHERE id = $3 AND (user_id = $1 OR guest_id = $2)
            ",
        )
        .bind(user_id)
        .bind(guest_id)
        .bind(line_id)
        .bind(to_db_quantity(quantity)?)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove one line. Returns `false` if the owner has no such line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove(
        &self,
        owner: CartOwner,
        line_id: CartItemId,
    ) -> Result<bool, RepositoryError> {
        let (user_id, guest_id) = owner_params(owner);
        let result = sqlx::query(
            "DELETE FROM shop.cart_item WHERE id = $3 AND (user_id = $1 OR guest_id = $2)",
        )
        .bind(user_id)
        .bind(guest_id)
        .bind(line_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self, owner: CartOwner) -> Result<u64, RepositoryError> {
        clear_lines(self.pool, owner).await
    }

    /// Apply a merge plan that folds a guest cart into a user's cart.
    ///
    /// Runs in one transaction; guest lines left over afterwards are deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails.
    pub async fn apply_merge(
        &self,
        guest_id: Uuid,
        user_id: UserId,
        steps: &[MergeStep],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        for step in steps {
            match *step {
                MergeStep::Move { line, quantity } => {
                    sqlx::query(
                        r"
                        UPDATE shop.cart_item
                        SET user_id = $1, guest_id = NULL, quantity = $3, updated_at = now()
                        WHERE id = $2 AND guest_id = $4
                        ",
                    )
                    .bind(user_id)
                    .bind(line)
                    .bind(to_db_quantity(quantity)?)
                    .bind(guest_id)
                    .execute(&mut *tx)
                    .await?;
                }
                MergeStep::Combine { into, quantity } => {
                    sqlx::query(
                        r"
                        UPDATE shop.cart_item
                        SET quantity = $3, updated_at = now()
                        WHERE id = $2 AND user_id = $1
                        ",
                    )
                    .bind(user_id)
                    .bind(into)
                    .bind(to_db_quantity(quantity)?)
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }

        sqlx::query("DELETE FROM shop.cart_item WHERE guest_id = $1")
            .bind(guest_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
