//! Catalog queries: categories, products, variants and stock.
//!
//! Only `ACTIVE` products are returned to customers. Optional filters are
//! passed as nullable parameters so each listing stays a single prepared
//! statement.

use rust_decimal::Decimal;
use sqlx::PgPool;

use malmequer_core::{ColorId, ProductId, SizeId, StockItemId};

use super::RepositoryError;
use crate::models::{
    Category, CategorySummary, Product, ProductColor, ProductFilter, ProductSize, ProductSummary,
    RatingSummary, StockItem,
};

const SUMMARY_COLUMNS: &str = "p.id, p.name, p.slug, p.price, p.compare_at_price, p.image_url, \
     p.featured, c.slug AS category_slug, p.created_at";

const PRODUCT_COLUMNS: &str = "p.id, p.category_id, p.name, p.slug, p.description, p.price, \
     p.compare_at_price, p.status, p.image_url, p.featured, p.created_at, p.updated_at";

const LISTING_WHERE: &str = r"
    p.status = 'ACTIVE'
    AND ($1::text IS NULL OR c.slug = $1)
    AND ($2::numeric IS NULL OR p.price >= $2)
    AND ($3::numeric IS NULL OR p.price <= $3)
    AND ($4::boolean IS NULL OR p.featured = $4)
    AND ($5::text IS NULL OR p.name ILIKE $5 OR p.description ILIKE $5)
";

/// Build an `ILIKE` pattern that matches `text` anywhere, escaping wildcards.
#[must_use]
pub fn contains_pattern(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    escaped.push('%');
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

#[derive(sqlx::FromRow)]
struct RatingRow {
    average: Option<Decimal>,
    count: i64,
}

/// Repository for catalog reads.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List visible products matching `filter`, plus the total match count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_products(
        &self,
        filter: &ProductFilter,
    ) -> Result<(Vec<ProductSummary>, i64), RepositoryError> {
        let pattern = filter.query().map(contains_pattern);
        let category = filter.category.as_deref().filter(|c| !c.is_empty());

        let total: i64 = sqlx::query_scalar(&format!(
            r"
            SELECT COUNT(*)
            FROM shop.product p
            LEFT JOIN shop.category c ON c.id = p.category_id
            WHERE {LISTING_WHERE}
            "
        ))
        .bind(category)
        .bind(filter.min_price)
        .bind(filter.max_price)
        .bind(filter.featured)
        .bind(pattern.as_deref())
        .fetch_one(self.pool)
        .await?;

        let products = sqlx::query_as::<_, ProductSummary>(&format!(
            r"
            SELECT {SUMMARY_COLUMNS}
            FROM shop.product p
            LEFT JOIN shop.category c ON c.id = p.category_id
            WHERE {LISTING_WHERE}
            ORDER BY {order}
            LIMIT $6 OFFSET $7
            ",
            order = filter.sort.order_by(),
        ))
        .bind(category)
        .bind(filter.min_price)
        .bind(filter.max_price)
        .bind(filter.featured)
        .bind(pattern.as_deref())
        .bind(i64::from(filter.per_page()))
        .bind(filter.offset())
        .fetch_all(self.pool)
        .await?;

        Ok((products, total))
    }

    /// Case-insensitive match on product name, description or category name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(
        &self,
        query: &str,
        limit: i64,
    ) -> Result<Vec<ProductSummary>, RepositoryError> {
        let products = sqlx::query_as::<_, ProductSummary>(&format!(
            r"
            SELECT {SUMMARY_COLUMNS}
            FROM shop.product p
            LEFT JOIN shop.category c ON c.id = p.category_id
            WHERE p.status = 'ACTIVE'
              AND (p.name ILIKE $1 OR p.description ILIKE $1 OR c.name ILIKE $1)
            ORDER BY (p.name ILIKE $1) DESC, p.featured DESC, p.name ASC
            LIMIT $2
            "
        ))
        .bind(contains_pattern(query))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// Featured products first, then newest, skipping `exclude`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn featured_or_newest(
        &self,
        limit: i64,
        exclude: &[ProductId],
    ) -> Result<Vec<ProductSummary>, RepositoryError> {
        let exclude: Vec<i32> = exclude.iter().map(ProductId::as_i32).collect();
        let products = sqlx::query_as::<_, ProductSummary>(&format!(
            r"
            SELECT {SUMMARY_COLUMNS}
            FROM shop.product p
            LEFT JOIN shop.category c ON c.id = p.category_id
            WHERE p.status = 'ACTIVE' AND NOT (p.id = ANY($2))
            ORDER BY p.featured DESC, p.created_at DESC
            LIMIT $1
            "
        ))
        .bind(limit)
        .bind(&exclude)
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// Visible products with the given ids, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn summaries_by_ids(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<ProductSummary>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let products = sqlx::query_as::<_, ProductSummary>(&format!(
            r"
            SELECT {SUMMARY_COLUMNS}
            FROM shop.product p
            LEFT JOIN shop.category c ON c.id = p.category_id
            WHERE p.status = 'ACTIVE' AND p.id = ANY($1)
            "
        ))
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// Get a visible product by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_product_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.product p WHERE p.slug = $1 AND p.status = 'ACTIVE'"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// Get a visible product by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.product p WHERE p.id = $1 AND p.status = 'ACTIVE'"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn sizes(&self, product_id: ProductId) -> Result<Vec<ProductSize>, RepositoryError> {
        let sizes = sqlx::query_as::<_, ProductSize>(
            r"
            SELECT id, label, price_extra
            FROM shop.product_size
            WHERE product_id = $1
            ORDER BY position, id
            ",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        Ok(sizes)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn colors(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ProductColor>, RepositoryError> {
        let colors = sqlx::query_as::<_, ProductColor>(
            r"
            SELECT id, name, hex, price_extra
            FROM shop.product_color
            WHERE product_id = $1
            ORDER BY position, id
            ",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        Ok(colors)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stock_items(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<StockItem>, RepositoryError> {
        let items = sqlx::query_as::<_, StockItem>(
            r"
            SELECT id, product_id, size_id, color_id, quantity, sku
            FROM shop.stock_item
            WHERE product_id = $1
            ORDER BY id
            ",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_stock_item(
        &self,
        id: StockItemId,
    ) -> Result<Option<StockItem>, RepositoryError> {
        let item = sqlx::query_as::<_, StockItem>(
            r"
            SELECT id, product_id, size_id, color_id, quantity, sku
            FROM shop.stock_item
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(item)
    }

    /// Find the stock item for a size/color combination of a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_stock_item(
        &self,
        product_id: ProductId,
        size_id: Option<SizeId>,
        color_id: Option<ColorId>,
    ) -> Result<Option<StockItem>, RepositoryError> {
        let item = sqlx::query_as::<_, StockItem>(
            r"
            SELECT id, product_id, size_id, color_id, quantity, sku
            FROM shop.stock_item
            WHERE product_id = $1
              AND size_id IS NOT DISTINCT FROM $2
              AND color_id IS NOT DISTINCT FROM $3
            ",
        )
        .bind(product_id)
        .bind(size_id)
        .bind(color_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(item)
    }

    /// Whether the product tracks inventory per variant.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn has_stock_items(&self, product_id: ProductId) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM shop.stock_item WHERE product_id = $1)",
        )
        .bind(product_id)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// Average rating (one decimal) and review count for a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn rating_summary(
        &self,
        product_id: ProductId,
    ) -> Result<RatingSummary, RepositoryError> {
        let row = sqlx::query_as::<_, RatingRow>(
            r"
            SELECT ROUND(AVG(rating)::numeric, 1) AS average, COUNT(*) AS count
            FROM shop.review
            WHERE product_id = $1
            ",
        )
        .bind(product_id)
        .fetch_one(self.pool)
        .await?;

        Ok(RatingSummary {
            average: row.average,
            count: row.count,
        })
    }

    /// All categories with their visible product counts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_categories(&self) -> Result<Vec<CategorySummary>, RepositoryError> {
        let categories = sqlx::query_as::<_, CategorySummary>(
            r"
            SELECT c.id, c.name, c.slug, c.description, c.parent_id,
                   COUNT(p.id) AS product_count
            FROM shop.category c
            LEFT JOIN shop.product p ON p.category_id = c.id AND p.status = 'ACTIVE'
            GROUP BY c.id
            ORDER BY c.name
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(categories)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_category_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<Category>, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, slug, description, parent_id FROM shop.category WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(category)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_category(
        &self,
        id: malmequer_core::CategoryId,
    ) -> Result<Option<Category>, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, slug, description, parent_id FROM shop.category WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("linen"), "%linen%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
    }
}
