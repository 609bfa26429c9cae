//! Seed the catalog from a YAML file.
//!
//! Categories and products whose slug already exists are left alone, so the
//! command can be re-run after editing the file to add new entries.
//!
//! ```yaml
//! categories:
//!   - name: Camisas
//!     description: Linho e algodão
//! products:
//!   - name: Camisa de Linho
//!     category: camisas
//!     price: "59.90"
//!     sizes: [{ label: S }, { label: M }, { label: L, price_extra: "2.00" }]
//!     colors: [{ name: Areia, hex: "#D8C8A8" }]
//!     stock: 10
//! ```

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, warn};

use malmequer_admin::db::{self, CategoryRepository, ProductRepository, RepositoryError};
use malmequer_admin::models::{
    CategoryInput, ColorInput, ProductInput, SizeInput, StockCell, StockGridInput, VariantsInput,
};
use malmequer_core::{CategoryId, ColorId, ProductStatus, SizeId};
use malmequer_storefront::db::CatalogRepository;

use super::database_url;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SeedFile {
    pub categories: Vec<SeedCategory>,
    pub products: Vec<SeedProduct>,
}

#[derive(Debug, Deserialize)]
pub struct SeedCategory {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    /// Slug of the parent category, listed earlier in the file.
    pub parent: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub name: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    /// Category slug.
    pub category: Option<String>,
    #[serde(default = "active")]
    pub status: ProductStatus,
    #[serde(default)]
    pub featured: bool,
    pub image_url: Option<String>,
    #[serde(default)]
    pub sizes: Vec<SizeInput>,
    #[serde(default)]
    pub colors: Vec<ColorInput>,
    /// Quantity for every size × color combination.
    #[serde(default)]
    pub stock: i32,
}

const fn active() -> ProductStatus {
    ProductStatus::Active
}

#[derive(Debug, Default)]
struct SeedSummary {
    categories_created: usize,
    products_created: usize,
    skipped: usize,
}

/// Load the catalog file into the `shop` schema.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, an entry is
/// invalid, or a database operation fails.
pub async fn catalog(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }
    let content = tokio::fs::read_to_string(path).await?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;
    info!(
        categories = seed.categories.len(),
        products = seed.products.len(),
        "Parsed catalog file"
    );

    let url = database_url("ADMIN_DATABASE_URL")?;
    let pool = db::create_pool(&url).await?;
    let categories = CategoryRepository::new(&pool);
    let products = ProductRepository::new(&pool);
    let catalog = CatalogRepository::new(&pool);
    let mut summary = SeedSummary::default();

    for entry in seed.categories {
        let parent_id = match &entry.parent {
            Some(slug) => Some(find_category(&catalog, slug).await?),
            None => None,
        };
        let valid = CategoryInput {
            name: entry.name,
            slug: entry.slug,
            description: entry.description,
            parent_id,
        }
        .validate(None)?;

        match categories.create(&valid).await {
            Ok(category) => {
                info!(slug = %category.slug, "Category created");
                summary.categories_created += 1;
            }
            Err(RepositoryError::Conflict(_)) => {
                info!(slug = %valid.slug, "Category exists, skipping");
                summary.skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    for entry in seed.products {
        let category_id = match &entry.category {
            Some(slug) => Some(find_category(&catalog, slug).await?),
            None => None,
        };
        let valid = ProductInput {
            name: entry.name,
            slug: entry.slug,
            description: entry.description,
            price: entry.price,
            compare_at_price: entry.compare_at_price,
            category_id,
            status: entry.status,
            image_url: entry.image_url,
            featured: entry.featured,
        }
        .validate()?;

        let product = match products.create(&valid).await {
            Ok(product) => product,
            Err(RepositoryError::Conflict(_)) => {
                info!(slug = %valid.slug, "Product exists, skipping");
                summary.skipped += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let variants = VariantsInput {
            sizes: entry.sizes,
            colors: entry.colors,
        };
        variants.validate()?;
        let (sizes, colors) = products.replace_variants(product.id, &variants).await?;

        let grid = StockGridInput {
            items: stock_grid(
                &sizes.iter().map(|s| s.id).collect::<Vec<_>>(),
                &colors.iter().map(|c| c.id).collect::<Vec<_>>(),
                entry.stock,
            ),
        };
        grid.validate()?;
        let items = products.set_stock(product.id, &grid.items).await?;
        info!(slug = %product.slug, stock_items = items.len(), "Product created");
        summary.products_created += 1;
    }

    info!(
        categories = summary.categories_created,
        products = summary.products_created,
        skipped = summary.skipped,
        "Seeding complete"
    );
    Ok(())
}

async fn find_category(
    catalog: &CatalogRepository<'_>,
    slug: &str,
) -> Result<CategoryId, Box<dyn std::error::Error>> {
    match catalog.get_category_by_slug(slug).await? {
        Some(category) => Ok(category.id),
        None => {
            warn!(slug, "Unknown category");
            Err(format!("unknown category: {slug}").into())
        }
    }
}

/// One cell per size × color; a product without sizes or colors gets a
/// single cell with neither.
fn stock_grid(sizes: &[SizeId], colors: &[ColorId], quantity: i32) -> Vec<StockCell> {
    let sizes: Vec<Option<SizeId>> = if sizes.is_empty() {
        vec![None]
    } else {
        sizes.iter().copied().map(Some).collect()
    };
    let colors: Vec<Option<ColorId>> = if colors.is_empty() {
        vec![None]
    } else {
        colors.iter().copied().map(Some).collect()
    };

    sizes
        .iter()
        .flat_map(|&size_id| {
            colors.iter().map(move |&color_id| StockCell {
                size_id,
                color_id,
                quantity,
                sku: None,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_grid_crosses_sizes_and_colors() {
        let cells = stock_grid(
            &[SizeId::new(1), SizeId::new(2)],
            &[ColorId::new(7), ColorId::new(8), ColorId::new(9)],
            4,
        );
        assert_eq!(cells.len(), 6);
        assert!(cells.iter().all(|c| c.quantity == 4 && c.sku.is_none()));
        assert_eq!(cells[0].size_id, Some(SizeId::new(1)));
        assert_eq!(cells[5].color_id, Some(ColorId::new(9)));
    }

    #[test]
    fn test_stock_grid_without_variants_is_one_cell() {
        let cells = stock_grid(&[], &[], 12);
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].size_id, None);
        assert_eq!(cells[0].color_id, None);
    }

    #[test]
    fn test_parses_bundled_catalog() {
        let seed: SeedFile =
            serde_yaml::from_str(include_str!("../../seed/catalog.yaml")).unwrap();
        assert!(!seed.categories.is_empty());
        assert!(seed.products.iter().all(|p| p.price > Decimal::ZERO));
    }
}
