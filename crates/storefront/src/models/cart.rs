//! Cart types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use malmequer_core::{CartItemId, CurrencyCode, ProductId, StockItemId, UserId};

/// Who a cart or wishlist belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CartOwner {
    User(UserId),
    Guest(Uuid),
}

impl CartOwner {
    #[must_use]
    pub const fn user_id(self) -> Option<UserId> {
        match self {
            Self::User(id) => Some(id),
            Self::Guest(_) => None,
        }
    }

    #[must_use]
    pub const fn guest_id(self) -> Option<Uuid> {
        match self {
            Self::User(_) => None,
            Self::Guest(id) => Some(id),
        }
    }
}

/// A stored cart line joined with what is needed to price it.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub product_slug: String,
    pub image_url: Option<String>,
    pub base_price: Decimal,
    pub stock_item_id: Option<StockItemId>,
    pub size_label: Option<String>,
    pub size_extra: Option<Decimal>,
    pub color_name: Option<String>,
    pub color_extra: Option<Decimal>,
    pub quantity: u32,
    /// Units in stock; `None` for products without stock items.
    pub available: Option<i32>,
}

/// A priced cart line.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub product_slug: String,
    pub image_url: Option<String>,
    pub stock_item_id: Option<StockItemId>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub available: Option<i32>,
}

/// The priced cart returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub item_count: u32,
    pub subtotal: Decimal,
    pub currency: CurrencyCode,
}

impl CartView {
    #[must_use]
    pub fn empty(currency: CurrencyCode) -> Self {
        Self {
            lines: Vec::new(),
            item_count: 0,
            subtotal: Decimal::ZERO,
            currency,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// The fields of a cart line that guest-cart merging looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeLine {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub stock_item_id: Option<StockItemId>,
    pub quantity: u32,
    pub available: Option<i32>,
}

impl From<&CartLine> for MergeLine {
    fn from(line: &CartLine) -> Self {
        Self {
            id: line.id,
            product_id: line.product_id,
            stock_item_id: line.stock_item_id,
            quantity: line.quantity,
            available: line.available,
        }
    }
}

/// One change applied when a guest cart is folded into a user's cart.
///
/// Guest lines not named by any step are deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStep {
    /// Hand the guest line over to the user with this quantity.
    Move { line: CartItemId, quantity: u32 },
    /// Set the user's existing line to this combined quantity.
    Combine { into: CartItemId, quantity: u32 },
}
