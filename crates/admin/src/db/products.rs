//! Product, variant and stock editing.
//!
//! Unlike the storefront's catalog queries, everything here sees products in
//! every status.

use sqlx::{PgPool, Postgres, Transaction};

use malmequer_core::{ProductId, ProductStatus, StockItemId};
use malmequer_storefront::db::CatalogRepository;
use malmequer_storefront::db::catalog::contains_pattern;
use malmequer_storefront::models::{Page, Product, ProductColor, ProductSize, StockItem};

use super::RepositoryError;
use crate::models::{
    AdminProductDetail, DeleteOutcome, LowStockItem, ProductListItem, ProductListQuery,
    StockCell, ValidProduct, VariantsInput, generate_sku,
};

const PRODUCT_COLUMNS: &str = "id, category_id, name, slug, description, price, \
     compare_at_price, status, image_url, featured, created_at, updated_at";

const STOCK_COLUMNS: &str = "id, product_id, size_id, color_id, quantity, sku";

const LIST_WHERE: &str = r"
    ($1::shop.product_status IS NULL OR p.status = $1)
    AND ($2::text IS NULL OR p.name ILIKE $2 OR p.slug ILIKE $2)
";

pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Products in every status, most recently edited first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        query: &ProductListQuery,
    ) -> Result<Page<ProductListItem>, RepositoryError> {
        let (page, per_page, offset) = query.window();
        let pattern = query.search().map(contains_pattern);

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM shop.product p WHERE {LIST_WHERE}"
        ))
        .bind(query.status)
        .bind(pattern.as_deref())
        .fetch_one(self.pool)
        .await?;

        let items = sqlx::query_as::<_, ProductListItem>(&format!(
            r"
            SELECT p.id, p.name, p.slug, p.price, p.status, p.featured,
                   c.name AS category_name,
                   COALESCE((SELECT SUM(si.quantity) FROM shop.stock_item si
                             WHERE si.product_id = p.id), 0)::bigint AS total_stock,
                   p.updated_at
            FROM shop.product p
            LEFT JOIN shop.category c ON c.id = p.category_id
            WHERE {LIST_WHERE}
            ORDER BY p.updated_at DESC, p.id DESC
            LIMIT $3 OFFSET $4
            "
        ))
        .bind(query.status)
        .bind(pattern.as_deref())
        .bind(i64::from(per_page))
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok(Page::new(items, page, per_page, total))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// Product with its sizes, colors and stock items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn detail(
        &self,
        id: ProductId,
    ) -> Result<Option<AdminProductDetail>, RepositoryError> {
        let Some(product) = self.get(id).await? else {
            return Ok(None);
        };
        let catalog = CatalogRepository::new(self.pool);
        Ok(Some(AdminProductDetail {
            product,
            sizes: catalog.sizes(id).await?,
            colors: catalog.colors(id).await?,
            stock_items: catalog.stock_items(id).await?,
        }))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create(&self, valid: &ValidProduct) -> Result<Product, RepositoryError> {
        let input = &valid.input;
        sqlx::query_as::<_, Product>(&format!(
            r"
            INSERT INTO shop.product (
                category_id, name, slug, description, price, compare_at_price,
                status, image_url, featured
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(input.category_id)
        .bind(input.name.trim())
        .bind(&valid.slug)
        .bind(&input.description)
        .bind(input.price)
        .bind(input.compare_at_price)
        .bind(input.status)
        .bind(input.image_url.as_deref())
        .bind(input.featured)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique_violation(e, "product slug"))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if there is no such product, or
    /// `RepositoryError::Conflict` if the slug is taken.
    pub async fn update(
        &self,
        id: ProductId,
        valid: &ValidProduct,
    ) -> Result<Product, RepositoryError> {
        let input = &valid.input;
        sqlx::query_as::<_, Product>(&format!(
            r"
            UPDATE shop.product
            SET category_id = $2, name = $3, slug = $4, description = $5, price = $6,
                compare_at_price = $7, status = $8, image_url = $9, featured = $10,
                updated_at = now()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(input.category_id)
        .bind(input.name.trim())
        .bind(&valid.slug)
        .bind(&input.description)
        .bind(input.price)
        .bind(input.compare_at_price)
        .bind(input.status)
        .bind(input.image_url.as_deref())
        .bind(input.featured)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique_violation(e, "product slug"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a product, or archive it when orders reference it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if there is no such product.
    pub async fn delete(&self, id: ProductId) -> Result<DeleteOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<i32> =
            sqlx::query_scalar("SELECT id FROM shop.product WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Err(RepositoryError::NotFound);
        }

        let referenced: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM shop.order_item WHERE product_id = $1)",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        let outcome = if referenced {
            sqlx::query("UPDATE shop.product SET status = $2, updated_at = now() WHERE id = $1")
                .bind(id)
                .bind(ProductStatus::Archived)
                .execute(&mut *tx)
                .await?;
            DeleteOutcome::Archived
        } else {
            sqlx::query("DELETE FROM shop.product WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            DeleteOutcome::Deleted
        };

        tx.commit().await?;
        Ok(outcome)
    }

    /// Make the product's sizes and colors exactly `variants`.
    ///
    /// Variants are matched by label (sizes) and name (colors); matches keep
    /// their id and stock, unlisted ones are removed along with their stock
    /// items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if there is no such product.
    pub async fn replace_variants(
        &self,
        id: ProductId,
        variants: &VariantsInput,
    ) -> Result<(Vec<ProductSize>, Vec<ProductColor>), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_product(&mut tx, id).await?;

        let labels: Vec<String> =
            variants.sizes.iter().map(|s| s.label.trim().to_string()).collect();
        sqlx::query("DELETE FROM shop.product_size WHERE product_id = $1 AND NOT (label = ANY($2))")
            .bind(id)
            .bind(&labels)
            .execute(&mut *tx)
            .await?;
        for (position, size) in (0_i32..).zip(&variants.sizes) {
            sqlx::query(
                r"
                INSERT INTO shop.product_size (product_id, label, price_extra, position)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (product_id, label)
                DO UPDATE SET price_extra = EXCLUDED.price_extra, position = EXCLUDED.position
                ",
            )
            .bind(id)
            .bind(size.label.trim())
            .bind(size.price_extra)
            .bind(position)
            .execute(&mut *tx)
            .await?;
        }

        let names: Vec<String> =
            variants.colors.iter().map(|c| c.name.trim().to_string()).collect();
        sqlx::query("DELETE FROM shop.product_color WHERE product_id = $1 AND NOT (name = ANY($2))")
            .bind(id)
            .bind(&names)
            .execute(&mut *tx)
            .await?;
        for (position, color) in (0_i32..).zip(&variants.colors) {
            sqlx::query(
                r"
                INSERT INTO shop.product_color (product_id, name, hex, price_extra, position)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (product_id, name)
                DO UPDATE SET hex = EXCLUDED.hex,
                              price_extra = EXCLUDED.price_extra,
                              position = EXCLUDED.position
                ",
            )
            .bind(id)
            .bind(color.name.trim())
            .bind(color.hex.as_deref())
            .bind(color.price_extra)
            .bind(position)
            .execute(&mut *tx)
            .await?;
        }

        touch_product(&mut tx, id).await?;
        tx.commit().await?;

        let catalog = CatalogRepository::new(self.pool);
        Ok((catalog.sizes(id).await?, catalog.colors(id).await?))
    }

    /// Set quantities for cells of the size × color grid.
    ///
    /// Cells are upserted; stock items not mentioned are left as they are. A
    /// new cell without an explicit SKU gets one from [`generate_sku`]; an
    /// existing one keeps its SKU.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown product, or
    /// `RepositoryError::Conflict` when a cell names a size or color of
    /// another product or a SKU already in use.
    pub async fn set_stock(
        &self,
        id: ProductId,
        cells: &[StockCell],
    ) -> Result<Vec<StockItem>, RepositoryError> {
        let catalog = CatalogRepository::new(self.pool);
        let sizes = catalog.sizes(id).await?;
        let colors = catalog.colors(id).await?;

        let mut tx = self.pool.begin().await?;
        let slug = lock_product(&mut tx, id).await?;

        for cell in cells {
            let size_label = match cell.size_id {
                Some(size_id) => Some(
                    sizes
                        .iter()
                        .find(|s| s.id == size_id)
                        .map(|s| s.label.as_str())
                        .ok_or_else(|| {
                            RepositoryError::Conflict(format!(
                                "size {size_id} is not a size of this product"
                            ))
                        })?,
                ),
                None => None,
            };
            let color_name = match cell.color_id {
                Some(color_id) => Some(
                    colors
                        .iter()
                        .find(|c| c.id == color_id)
                        .map(|c| c.name.as_str())
                        .ok_or_else(|| {
                            RepositoryError::Conflict(format!(
                                "color {color_id} is not a color of this product"
                            ))
                        })?,
                ),
                None => None,
            };

            let explicit_sku = cell
                .sku
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_uppercase);
            let generated = generate_sku(&slug, size_label, color_name);

            sqlx::query(
                r"
                INSERT INTO shop.stock_item (product_id, size_id, color_id, quantity, sku)
                VALUES ($1, $2, $3, $4, COALESCE($5, $6))
                ON CONFLICT (product_id, (COALESCE(size_id, 0)), (COALESCE(color_id, 0)))
                DO UPDATE SET quantity = EXCLUDED.quantity,
                              sku = COALESCE($5, shop.stock_item.sku)
                ",
            )
            .bind(id)
            .bind(cell.size_id)
            .bind(cell.color_id)
            .bind(cell.quantity)
            .bind(explicit_sku.as_deref())
            .bind(&generated)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::from_unique_violation(e, "sku"))?;
        }

        touch_product(&mut tx, id).await?;
        tx.commit().await?;

        Ok(catalog.stock_items(id).await?)
    }

    /// Add `delta` units to a stock item; the result never drops below zero.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the stock item does not belong
    /// to the product.
    pub async fn adjust_stock(
        &self,
        product_id: ProductId,
        stock_item_id: StockItemId,
        delta: i32,
    ) -> Result<StockItem, RepositoryError> {
        sqlx::query_as::<_, StockItem>(&format!(
            r"
            UPDATE shop.stock_item
            SET quantity = GREATEST(quantity::bigint + $3, 0)::int
            WHERE id = $1 AND product_id = $2
            RETURNING {STOCK_COLUMNS}
            "
        ))
        .bind(stock_item_id)
        .bind(product_id)
        .bind(i64::from(delta))
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Stock items with `quantity <= threshold`, emptiest first.
    ///
    /// Archived products are left out.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn low_stock(&self, threshold: i32) -> Result<Vec<LowStockItem>, RepositoryError> {
        let items = sqlx::query_as::<_, LowStockItem>(
            r"
            SELECT si.id AS stock_item_id, p.id AS product_id, p.name AS product_name,
                   p.slug AS product_slug, si.sku, s.label AS size_label,
                   c.name AS color_name, si.quantity
            FROM shop.stock_item si
            JOIN shop.product p ON p.id = si.product_id
            LEFT JOIN shop.product_size s ON s.id = si.size_id
            LEFT JOIN shop.product_color c ON c.id = si.color_id
            WHERE si.quantity <= $1 AND p.status <> 'ARCHIVED'
            ORDER BY si.quantity ASC, p.name ASC, si.sku ASC
            ",
        )
        .bind(threshold)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }
}

/// Lock the product row and return its slug.
async fn lock_product(
    tx: &mut Transaction<'_, Postgres>,
    id: ProductId,
) -> Result<String, RepositoryError> {
    sqlx::query_scalar("SELECT slug FROM shop.product WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(RepositoryError::NotFound)
}

async fn touch_product(
    tx: &mut Transaction<'_, Postgres>,
    id: ProductId,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE shop.product SET updated_at = now() WHERE id = $1")
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
