//! Catalog editing types: product and category input, variants and stock.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use malmequer_core::{CategoryId, ColorId, ProductId, ProductStatus, SizeId, StockItemId};
use malmequer_storefront::models::{Category, Product, ProductColor, ProductSize, StockItem};

use super::page_window;

/// Lower-case, ASCII alphanumerics separated by single hyphens.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Stock keeping unit for a variant: `<slug>-<size>-<color>`, upper-cased.
///
/// Missing dimensions are left out, so a product without variants gets its
/// slug as SKU.
#[must_use]
pub fn generate_sku(
    product_slug: &str,
    size_label: Option<&str>,
    color_name: Option<&str>,
) -> String {
    [Some(product_slug), size_label, color_name]
        .into_iter()
        .flatten()
        .map(slugify)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
        .to_uppercase()
}

fn required(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field} is required"));
    }
    Ok(())
}

/// Resolve an explicit slug or derive one from the name.
fn resolve_slug(explicit: Option<&str>, name: &str) -> Result<String, String> {
    let slug = explicit
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map_or_else(|| slugify(name), slugify);
    if slug.is_empty() {
        return Err("slug must contain letters or digits".to_string());
    }
    Ok(slug)
}

// =============================================================================
// Products
// =============================================================================

/// Create or full-update payload for a product.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub category_id: Option<CategoryId>,
    #[serde(default = "default_status")]
    pub status: ProductStatus,
    pub image_url: Option<String>,
    #[serde(default)]
    pub featured: bool,
}

const fn default_status() -> ProductStatus {
    ProductStatus::Draft
}

/// A validated product payload with its final slug.
#[derive(Debug, Clone)]
pub struct ValidProduct {
    pub input: ProductInput,
    pub slug: String,
}

impl ProductInput {
    /// # Errors
    ///
    /// Returns a message naming the first invalid field.
    pub fn validate(self) -> Result<ValidProduct, String> {
        required("name", &self.name)?;
        if self.price < Decimal::ZERO {
            return Err("price must not be negative".to_string());
        }
        if let Some(compare_at) = self.compare_at_price
            && compare_at < self.price
        {
            return Err("compare_at_price must not be below price".to_string());
        }
        let slug = resolve_slug(self.slug.as_deref(), &self.name)?;
        Ok(ValidProduct { input: self, slug })
    }
}

/// Admin product listing filters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProductListQuery {
    pub status: Option<ProductStatus>,
    pub q: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ProductListQuery {
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

/// A row of the admin product table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductListItem {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub price: Decimal,
    pub status: ProductStatus,
    pub featured: bool,
    pub category_name: Option<String>,
    pub total_stock: i64,
    pub updated_at: DateTime<Utc>,
}

/// Product with all variant and stock data.
#[derive(Debug, Clone, Serialize)]
pub struct AdminProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub sizes: Vec<ProductSize>,
    pub colors: Vec<ProductColor>,
    pub stock_items: Vec<StockItem>,
}

/// What a delete did to the product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted,
    /// Referenced by orders, so only archived.
    Archived,
}

// =============================================================================
// Variants and stock
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SizeInput {
    pub label: String,
    #[serde(default)]
    pub price_extra: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColorInput {
    pub name: String,
    pub hex: Option<String>,
    #[serde(default)]
    pub price_extra: Decimal,
}

/// Replacement set of sizes and colors for a product.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VariantsInput {
    pub sizes: Vec<SizeInput>,
    pub colors: Vec<ColorInput>,
}

fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

impl VariantsInput {
    /// # Errors
    ///
    /// Returns a message for blank or duplicate labels, negative extras or
    /// malformed hex colors.
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for size in &self.sizes {
            required("size label", &size.label)?;
            if size.price_extra < Decimal::ZERO {
                return Err(format!("size {} has a negative price extra", size.label));
            }
            if !seen.insert(size.label.trim().to_lowercase()) {
                return Err(format!("duplicate size {}", size.label));
            }
        }

        seen.clear();
        for color in &self.colors {
            required("color name", &color.name)?;
            if color.price_extra < Decimal::ZERO {
                return Err(format!("color {} has a negative price extra", color.name));
            }
            if let Some(hex) = &color.hex
                && !is_hex_color(hex)
            {
                return Err(format!("color {} has an invalid hex value", color.name));
            }
            if !seen.insert(color.name.trim().to_lowercase()) {
                return Err(format!("duplicate color {}", color.name));
            }
        }
        Ok(())
    }
}

/// One cell of the size × color stock grid.
#[derive(Debug, Clone, Deserialize)]
pub struct StockCell {
    pub size_id: Option<SizeId>,
    pub color_id: Option<ColorId>,
    pub quantity: i32,
    pub sku: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StockGridInput {
    pub items: Vec<StockCell>,
}

impl StockGridInput {
    /// # Errors
    ///
    /// Returns a message for negative quantities or repeated cells.
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for cell in &self.items {
            if cell.quantity < 0 {
                return Err("quantity must not be negative".to_string());
            }
            if !seen.insert((cell.size_id, cell.color_id)) {
                return Err("each size and color combination may appear once".to_string());
            }
        }
        Ok(())
    }
}

/// Relative change to one stock item.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct StockAdjustment {
    pub delta: i32,
}

/// A stock item at or below the low-stock threshold.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LowStockItem {
    pub stock_item_id: StockItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub product_slug: String,
    pub sku: String,
    pub size_label: Option<String>,
    pub color_name: Option<String>,
    pub quantity: i32,
}

// =============================================================================
// Categories
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<CategoryId>,
}

#[derive(Debug, Clone)]
pub struct ValidCategory {
    pub input: CategoryInput,
    pub slug: String,
}

impl CategoryInput {
    /// `current` is the category being updated, if any.
    ///
    /// # Errors
    ///
    /// Returns a message for a blank name, an empty slug or a category that
    /// would be its own parent.
    pub fn validate(self, current: Option<CategoryId>) -> Result<ValidCategory, String> {
        required("name", &self.name)?;
        if current.is_some() && self.parent_id == current {
            return Err("a category cannot be its own parent".to_string());
        }
        let slug = resolve_slug(self.slug.as_deref(), &self.name)?;
        Ok(ValidCategory { input: self, slug })
    }
}

/// A category with the number of products (any status) in it.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AdminCategory {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub category: Category,
    pub product_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, price: i64) -> ProductInput {
        ProductInput {
            name: name.to_string(),
            slug: None,
            description: String::new(),
            price: Decimal::new(price, 2),
            compare_at_price: None,
            category_id: None,
            status: ProductStatus::Draft,
            image_url: None,
            featured: false,
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Camisa de Linho"), "camisa-de-linho");
        assert_eq!(slugify("  T-Shirt (Organic)  "), "t-shirt-organic");
        assert_eq!(slugify("--"), "");
    }

    #[test]
    fn test_generate_sku() {
        assert_eq!(
            generate_sku("linen-shirt", Some("M"), Some("Sand Beige")),
            "LINEN-SHIRT-M-SAND-BEIGE"
        );
        assert_eq!(generate_sku("tote-bag", None, Some("Navy")), "TOTE-BAG-NAVY");
        assert_eq!(generate_sku("tote-bag", None, None), "TOTE-BAG");
    }

    #[test]
    fn test_product_slug_derived_from_name() {
        let valid = product("Linen Shirt", 2990).validate().unwrap();
        assert_eq!(valid.slug, "linen-shirt");
    }

    #[test]
    fn test_product_rejects_negative_price_and_low_compare_at() {
        assert!(product("Shirt", -1).validate().is_err());

        let mut input = product("Shirt", 2990);
        input.compare_at_price = Some(Decimal::new(1990, 2));
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_variants_validation() {
        let ok = VariantsInput {
            sizes: vec![
                SizeInput { label: "S".into(), price_extra: Decimal::ZERO },
                SizeInput { label: "XL".into(), price_extra: Decimal::new(200, 2) },
            ],
            colors: vec![ColorInput {
                name: "Sand".into(),
                hex: Some("#D8C8A8".into()),
                price_extra: Decimal::ZERO,
            }],
        };
        assert!(ok.validate().is_ok());

        let duplicate = VariantsInput {
            sizes: vec![
                SizeInput { label: "M".into(), price_extra: Decimal::ZERO },
                SizeInput { label: "m".into(), price_extra: Decimal::ZERO },
            ],
            colors: Vec::new(),
        };
        assert!(duplicate.validate().is_err());

        let bad_hex = VariantsInput {
            sizes: Vec::new(),
            colors: vec![ColorInput {
                name: "Navy".into(),
                hex: Some("navy".into()),
                price_extra: Decimal::ZERO,
            }],
        };
        assert!(bad_hex.validate().is_err());
    }

    #[test]
    fn test_stock_grid_validation() {
        let cell = |size: i32, quantity: i32| StockCell {
            size_id: Some(SizeId::new(size)),
            color_id: None,
            quantity,
            sku: None,
        };
        assert!(StockGridInput { items: vec![cell(1, 3), cell(2, 0)] }.validate().is_ok());
        assert!(StockGridInput { items: vec![cell(1, -1)] }.validate().is_err());
        assert!(StockGridInput { items: vec![cell(1, 3), cell(1, 4)] }.validate().is_err());
    }

    #[test]
    fn test_category_cannot_parent_itself() {
        let input = CategoryInput {
            name: "Shirts".into(),
            slug: None,
            description: None,
            parent_id: Some(CategoryId::new(4)),
        };
        assert!(input.clone().validate(Some(CategoryId::new(4))).is_err());
        assert_eq!(input.validate(None).unwrap().slug, "shirts");
    }
}
