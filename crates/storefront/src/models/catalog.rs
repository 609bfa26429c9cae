//! Catalog types: categories, products and their variants.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use malmequer_core::{CategoryId, ColorId, ProductId, ProductStatus, SizeId, StockItemId};

/// Default number of products per page.
pub const DEFAULT_PER_PAGE: u32 = 20;
/// Largest page a client may request.
pub const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub parent_id: Option<CategoryId>,
}

/// A category with the number of visible products in it.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CategorySummary {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub category: Category,
    pub product_count: i64,
}

/// Product fields needed for listings and cards.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub image_url: Option<String>,
    pub featured: bool,
    pub category_slug: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub category_id: Option<CategoryId>,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub status: ProductStatus,
    pub image_url: Option<String>,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductSize {
    pub id: SizeId,
    pub label: String,
    pub price_extra: Decimal,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductColor {
    pub id: ColorId,
    pub name: String,
    pub hex: Option<String>,
    pub price_extra: Decimal,
}

/// Inventory for one size × color combination.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StockItem {
    pub id: StockItemId,
    pub product_id: ProductId,
    pub size_id: Option<SizeId>,
    pub color_id: Option<ColorId>,
    pub quantity: i32,
    pub sku: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RatingSummary {
    /// Mean rating rounded to one decimal, `None` without reviews.
    pub average: Option<Decimal>,
    pub count: i64,
}

/// Everything the product page needs.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub category: Option<Category>,
    pub sizes: Vec<ProductSize>,
    pub colors: Vec<ProductColor>,
    pub stock_items: Vec<StockItem>,
    pub rating: RatingSummary,
}

impl ProductDetail {
    /// Whether any variant can currently be bought.
    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.stock_items.is_empty() || self.stock_items.iter().any(|s| s.quantity > 0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

impl ProductSort {
    /// `ORDER BY` clause for the product listing query.
    #[must_use]
    pub const fn order_by(self) -> &'static str {
        match self {
            Self::Newest => "p.created_at DESC, p.id DESC",
            Self::PriceAsc => "p.price ASC, p.id ASC",
            Self::PriceDesc => "p.price DESC, p.id DESC",
            Self::Name => "p.name ASC, p.id ASC",
        }
    }
}

/// Query-string filters for the product listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub featured: Option<bool>,
    pub q: Option<String>,
    pub sort: ProductSort,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ProductFilter {
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    #[must_use]
    pub fn per_page(&self) -> u32 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page() - 1) * i64::from(self.per_page())
    }

    /// Trimmed search text, `None` when blank.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

/// One page of results plus the total row count.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, page: u32, per_page: u32, total: i64) -> Self {
        let per = i64::from(per_page.max(1));
        Self {
            items,
            page,
            per_page,
            total,
            total_pages: (total + per - 1) / per,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_pagination_is_clamped() {
        let filter = ProductFilter {
            page: Some(0),
            per_page: Some(500),
            ..ProductFilter::default()
        };
        assert_eq!(filter.page(), 1);
        assert_eq!(filter.per_page(), MAX_PER_PAGE);
        assert_eq!(filter.offset(), 0);

        let filter = ProductFilter {
            page: Some(3),
            ..ProductFilter::default()
        };
        assert_eq!(filter.offset(), 40);
    }

    #[test]
    fn test_blank_query_is_ignored() {
        let filter = ProductFilter {
            q: Some("   ".to_string()),
            ..ProductFilter::default()
        };
        assert_eq!(filter.query(), None);
    }

    #[test]
    fn test_page_counts() {
        let page: Page<u8> = Page::new(vec![], 1, 20, 41);
        assert_eq!(page.total_pages, 3);
        let empty: Page<u8> = Page::new(vec![], 1, 20, 0);
        assert_eq!(empty.total_pages, 0);
    }
}
