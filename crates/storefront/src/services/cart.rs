//! Cart operations for users and guests.
//!
//! Lines are priced from live catalog data on every read; the assembled view
//! is cached per owner and dropped on every mutation.

use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

use malmequer_core::pricing::{cart_subtotal, line_total, unit_price};
use malmequer_core::{
    CartItemId, ColorId, CurrencyCode, ProductId, SizeId, StockItemId, UserId,
};

use crate::cache::StoreCache;
use crate::db::carts::fetch_lines;
use crate::db::{CartRepository, CatalogRepository, RepositoryError};
use crate::models::{CartLine, CartLineView, CartOwner, CartView, MergeLine, MergeStep};

#[derive(Debug, Error)]
pub enum CartError {
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    #[error("product not found")]
    ProductNotFound,

    #[error("choose a size and color for this product")]
    VariantRequired,

    #[error("this size and color combination does not exist")]
    VariantNotFound,

    #[error("only {available} left in stock")]
    InsufficientStock { available: u32 },

    #[error("cart line not found")]
    LineNotFound,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// How the client identifies the variant it wants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VariantChoice {
    pub stock_item_id: Option<StockItemId>,
    pub size_id: Option<SizeId>,
    pub color_id: Option<ColorId>,
}

impl VariantChoice {
    const fn is_empty(&self) -> bool {
        self.stock_item_id.is_none() && self.size_id.is_none() && self.color_id.is_none()
    }
}

/// Units of a stock item a line may hold. Stockless products are unlimited.
#[must_use]
pub fn stock_limit(available: Option<i32>) -> Option<u32> {
    available.map(|a| u32::try_from(a).unwrap_or(0))
}

/// Reject `quantity` if it exceeds the available units.
///
/// # Errors
///
/// Returns `CartError::InsufficientStock` with the available count.
pub fn check_stock(available: Option<i32>, quantity: u32) -> Result<(), CartError> {
    match stock_limit(available) {
        Some(limit) if quantity > limit => Err(CartError::InsufficientStock { available: limit }),
        _ => Ok(()),
    }
}

/// Price stored lines into the view returned to clients.
#[must_use]
pub fn build_cart_view(lines: Vec<CartLine>, currency: CurrencyCode) -> CartView {
    let lines: Vec<CartLineView> = lines
        .into_iter()
        .map(|line| {
            let unit = unit_price(line.base_price, line.size_extra, line.color_extra);
            CartLineView {
                id: line.id,
                product_id: line.product_id,
                product_name: line.product_name,
                product_slug: line.product_slug,
                image_url: line.image_url,
                stock_item_id: line.stock_item_id,
                size: line.size_label,
                color: line.color_name,
                quantity: line.quantity,
                unit_price: unit,
                line_total: line_total(unit, line.quantity),
                available: line.available,
            }
        })
        .collect();

    CartView {
        subtotal: cart_subtotal(lines.iter().map(|l| l.line_total)),
        item_count: lines.iter().map(|l| l.quantity).sum(),
        lines,
        currency,
    }
}

/// Plan how a guest cart folds into a user's cart.
///
/// A guest line for a product/stock item the user already has is summed into
/// the user's line; any other guest line is handed over. Quantities are capped
/// at available stock, and guest lines with nothing left to give are dropped.
/// The user's own lines are never reduced.
#[must_use]
pub fn plan_cart_merge(guest: &[MergeLine], user: &[MergeLine]) -> Vec<MergeStep> {
    let cap = |quantity: u32, available: Option<i32>| {
        stock_limit(available).map_or(quantity, |limit| quantity.min(limit))
    };

    guest
        .iter()
        .filter_map(|g| {
            let existing = user
                .iter()
                .find(|u| u.product_id == g.product_id && u.stock_item_id == g.stock_item_id);

            match existing {
                Some(u) => {
                    let combined = cap(u.quantity.saturating_add(g.quantity), g.available);
                    (combined > u.quantity).then_some(MergeStep::Combine {
                        into: u.id,
                        quantity: combined,
                    })
                }
                None => {
                    let quantity = cap(g.quantity, g.available);
                    (quantity > 0).then_some(MergeStep::Move {
                        line: g.id,
                        quantity,
                    })
                }
            }
        })
        .collect()
}

/// Cart service bound to one request.
pub struct CartService<'a> {
    pool: &'a PgPool,
    cache: &'a StoreCache,
    currency: CurrencyCode,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, cache: &'a StoreCache, currency: CurrencyCode) -> Self {
        Self {
            pool,
            cache,
            currency,
        }
    }

    /// # Errors
    ///
    /// Returns `CartError::Repository` if the cart cannot be loaded.
    pub async fn view(&self, owner: CartOwner) -> Result<CartView, CartError> {
        if let Some(view) = self.cache.cart(&owner).await {
            return Ok(view);
        }
        let lines = fetch_lines(self.pool, owner).await?;
        let view = build_cart_view(lines, self.currency);
        self.cache.store_cart(owner, view.clone()).await;
        Ok(view)
    }

    /// Add units of a product, merging into an existing line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InsufficientStock` if the line would exceed stock,
    /// and `CartError::VariantRequired` if the product has stock items but
    /// none was chosen.
    #[instrument(skip(self), fields(owner = ?owner))]
    pub async fn add(
        &self,
        owner: CartOwner,
        product_id: ProductId,
        variant: VariantChoice,
        quantity: u32,
    ) -> Result<CartView, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }

        let catalog = CatalogRepository::new(self.pool);
        catalog
            .get_product(product_id)
            .await?
            .ok_or(CartError::ProductNotFound)?;

        let stock_item = if variant.is_empty() {
            if catalog.has_stock_items(product_id).await? {
                return Err(CartError::VariantRequired);
            }
            None
        } else {
            let item = match variant.stock_item_id {
                Some(id) => catalog.get_stock_item(id).await?,
                None => {
                    catalog
                        .find_stock_item(product_id, variant.size_id, variant.color_id)
                        .await?
                }
            };
            let item = item
                .filter(|i| i.product_id == product_id)
                .ok_or(CartError::VariantNotFound)?;
            Some(item)
        };

        let stock_item_id = stock_item.as_ref().map(|i| i.id);
        let available = stock_item.as_ref().map(|i| i.quantity);

        let lines = fetch_lines(self.pool, owner).await?;
        let already = lines
            .iter()
            .find(|l| l.product_id == product_id && l.stock_item_id == stock_item_id)
            .map_or(0, |l| l.quantity);
        check_stock(available, already.saturating_add(quantity))?;

        CartRepository::new(self.pool)
            .add_quantity(owner, product_id, stock_item_id, quantity)
            .await?;
        tracing::info!(product_id = %product_id, quantity, "Added to cart");

        self.refresh(owner).await
    }

    /// Set a line's quantity; zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::LineNotFound` if the owner has no such line and
    /// `CartError::InsufficientStock` if the quantity exceeds stock.
    #[instrument(skip(self), fields(owner = ?owner))]
    pub async fn update(
        &self,
        owner: CartOwner,
        line_id: CartItemId,
        quantity: u32,
    ) -> Result<CartView, CartError> {
        if quantity == 0 {
            return self.remove(owner, line_id).await;
        }

        let lines = fetch_lines(self.pool, owner).await?;
        let line = lines
            .iter()
            .find(|l| l.id == line_id)
            .ok_or(CartError::LineNotFound)?;
        check_stock(line.available, quantity)?;

        if !CartRepository::new(self.pool)
            .set_quantity(owner, line_id, quantity)
            .await?
        {
            return Err(CartError::LineNotFound);
        }

        self.refresh(owner).await
    }

    /// # Errors
    ///
    /// Returns `CartError::LineNotFound` if the owner has no such line.
    pub async fn remove(
        &self,
        owner: CartOwner,
        line_id: CartItemId,
    ) -> Result<CartView, CartError> {
        if !CartRepository::new(self.pool).remove(owner, line_id).await? {
            return Err(CartError::LineNotFound);
        }
        self.refresh(owner).await
    }

    /// # Errors
    ///
    /// Returns `CartError::Repository` if the lines cannot be deleted.
    pub async fn clear(&self, owner: CartOwner) -> Result<CartView, CartError> {
        CartRepository::new(self.pool).clear(owner).await?;
        self.cache.invalidate_cart(&owner).await;
        Ok(CartView::empty(self.currency))
    }

    /// Fold a guest cart into a user's cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the merge cannot be applied.
    #[instrument(skip(self))]
    pub async fn merge_guest(&self, guest_id: Uuid, user_id: UserId) -> Result<(), CartError> {
        let guest_owner = CartOwner::Guest(guest_id);
        let user_owner = CartOwner::User(user_id);

        let guest: Vec<MergeLine> = fetch_lines(self.pool, guest_owner)
            .await?
            .iter()
            .map(MergeLine::from)
            .collect();
        if guest.is_empty() {
            return Ok(());
        }
        let user: Vec<MergeLine> = fetch_lines(self.pool, user_owner)
            .await?
            .iter()
            .map(MergeLine::from)
            .collect();

        let steps = plan_cart_merge(&guest, &user);
        CartRepository::new(self.pool)
            .apply_merge(guest_id, user_id, &steps)
            .await?;
        tracing::info!(guest_lines = guest.len(), steps = steps.len(), "Merged guest cart");

        self.cache.invalidate_cart(&guest_owner).await;
        self.cache.invalidate_cart(&user_owner).await;
        Ok(())
    }

    async fn refresh(&self, owner: CartOwner) -> Result<CartView, CartError> {
        self.cache.invalidate_cart(&owner).await;
        self.view(owner).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn line(
        id: i32,
        product: i32,
        stock: Option<i32>,
        quantity: u32,
        available: Option<i32>,
    ) -> MergeLine {
        MergeLine {
            id: CartItemId::new(id),
            product_id: ProductId::new(product),
            stock_item_id: stock.map(StockItemId::new),
            quantity,
            available,
        }
    }

    fn cart_line(id: i32, base: Decimal, size_extra: Option<Decimal>, quantity: u32) -> CartLine {
        CartLine {
            id: CartItemId::new(id),
            product_id: ProductId::new(id),
            product_name: format!("Product {id}"),
            product_slug: format!("product-{id}"),
            image_url: None,
            base_price: base,
            stock_item_id: None,
            size_label: size_extra.map(|_| "L".to_string()),
            size_extra,
            color_name: None,
            color_extra: None,
            quantity,
            available: None,
        }
    }

    #[test]
    fn test_build_cart_view_prices_lines() {
        let view = build_cart_view(
            vec![
                cart_line(1, Decimal::new(2000, 2), Some(Decimal::new(250, 2)), 2),
                cart_line(2, Decimal::new(999, 2), None, 1),
            ],
            CurrencyCode::EUR,
        );

        assert_eq!(view.lines[0].unit_price, Decimal::new(2250, 2));
        assert_eq!(view.lines[0].line_total, Decimal::new(4500, 2));
        assert_eq!(view.subtotal, Decimal::new(5499, 2));
        assert_eq!(view.item_count, 3);
        assert_eq!(view.lines[0].size.as_deref(), Some("L"));
    }

    #[test]
    fn test_build_cart_view_empty() {
        let view = build_cart_view(Vec::new(), CurrencyCode::EUR);
        assert!(view.is_empty());
        assert_eq!(view.subtotal, Decimal::ZERO);
    }

    #[test]
    fn test_check_stock() {
        assert!(check_stock(None, 1_000).is_ok());
        assert!(check_stock(Some(3), 3).is_ok());
        assert!(matches!(
            check_stock(Some(3), 4),
            Err(CartError::InsufficientStock { available: 3 })
        ));
        assert!(matches!(
            check_stock(Some(-1), 1),
            Err(CartError::InsufficientStock { available: 0 })
        ));
    }

    #[test]
    fn test_merge_moves_new_lines() {
        let steps = plan_cart_merge(&[line(10, 1, Some(100), 2, Some(5))], &[]);
        assert_eq!(
            steps,
            vec![MergeStep::Move {
                line: CartItemId::new(10),
                quantity: 2
            }]
        );
    }

    #[test]
    fn test_merge_sums_matching_lines_capped_at_stock() {
        let guest = [line(10, 1, Some(100), 3, Some(4))];
        let user = [line(20, 1, Some(100), 2, Some(4))];
        assert_eq!(
            plan_cart_merge(&guest, &user),
            vec![MergeStep::Combine {
                into: CartItemId::new(20),
                quantity: 4
            }]
        );
    }

    #[test]
    fn test_merge_distinguishes_stock_items() {
        let guest = [line(10, 1, Some(100), 1, Some(9))];
        let user = [line(20, 1, Some(101), 1, Some(9))];
        assert_eq!(
            plan_cart_merge(&guest, &user),
            vec![MergeStep::Move {
                line: CartItemId::new(10),
                quantity: 1
            }]
        );
    }

    #[test]
    fn test_merge_drops_out_of_stock_guest_lines() {
        let guest = [line(10, 1, Some(100), 2, Some(0))];
        assert!(plan_cart_merge(&guest, &[]).is_empty());
    }

    #[test]
    fn test_merge_never_reduces_user_line() {
        // User already holds more than is now in stock.
        let guest = [line(10, 1, Some(100), 1, Some(2))];
        let user = [line(20, 1, Some(100), 3, Some(2))];
        assert!(plan_cart_merge(&guest, &user).is_empty());
    }

    #[test]
    fn test_merge_stockless_products_are_unlimited() {
        let guest = [line(10, 1, None, 40, None)];
        let user = [line(20, 1, None, 70, None)];
        assert_eq!(
            plan_cart_merge(&guest, &user),
            vec![MergeStep::Combine {
                into: CartItemId::new(20),
                quantity: 110
            }]
        );
    }
}
