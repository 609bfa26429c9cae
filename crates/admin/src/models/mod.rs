//! Domain models for the back office.
//!
//! Catalog and order records shared with the storefront (`Product`,
//! `StockItem`, `OrderWithItems`, ...) come from `malmequer_storefront::models`.

pub mod activity;
pub mod admin_user;
pub mod catalog;
pub mod order;
pub mod session;

pub use activity::{ActivityEntry, ActivityQuery, NewActivity, actions};
pub use admin_user::{AdminRole, AdminUser};
pub use catalog::{
    AdminCategory, AdminProductDetail, CategoryInput, ColorInput, DeleteOutcome, LowStockItem,
    ProductInput, ProductListItem, ProductListQuery, SizeInput, StockAdjustment, StockCell,
    StockGridInput, ValidCategory, ValidProduct, VariantsInput, generate_sku, slugify,
};
pub use order::{OrderListItem, OrderListQuery, StatusUpdate};
pub use session::{CurrentAdmin, keys as session_keys};

pub use malmequer_storefront::models::Page;

/// Default number of rows per page.
pub const DEFAULT_PER_PAGE: u32 = 25;
/// Largest page a client may request.
pub const MAX_PER_PAGE: u32 = 200;

/// `(page, per_page, offset)` from optional query values.
#[must_use]
pub fn page_window(page: Option<u32>, per_page: Option<u32>) -> (u32, u32, i64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
    (page, per_page, i64::from(page - 1) * i64::from(per_page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_window() {
        assert_eq!(page_window(None, None), (1, DEFAULT_PER_PAGE, 0));
        assert_eq!(page_window(Some(3), Some(10)), (3, 10, 20));
        assert_eq!(page_window(Some(0), Some(1000)), (1, MAX_PER_PAGE, 0));
    }
}
