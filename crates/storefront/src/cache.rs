//! In-process response caches.
//!
//! Search results are cached for a minute and assembled carts for thirty
//! seconds. Cart entries are invalidated on every cart mutation.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use crate::models::{CartOwner, CartView, ProductSummary};

/// Search cache key: normalized query and result limit.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct SearchKey {
    pub query: String,
    pub limit: i64,
}

impl SearchKey {
    /// Build a key from raw user input. Whitespace is collapsed and case ignored.
    #[must_use]
    pub fn new(query: &str, limit: i64) -> Self {
        Self {
            query: normalize_query(query),
            limit,
        }
    }
}

/// Lowercase and collapse runs of whitespace.
#[must_use]
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Caches shared by all handlers.
#[derive(Clone)]
pub struct StoreCache {
    search: Cache<SearchKey, Arc<Vec<ProductSummary>>>,
    carts: Cache<CartOwner, CartView>,
}

impl Default for StoreCache {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            search: Cache::builder()
                .max_capacity(1000)
                .time_to_live(Duration::from_secs(60))
                .build(),
            carts: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(Duration::from_secs(30))
                .build(),
        }
    }

    pub async fn search(&self, key: &SearchKey) -> Option<Arc<Vec<ProductSummary>>> {
        self.search.get(key).await
    }

    pub async fn store_search(&self, key: SearchKey, results: Arc<Vec<ProductSummary>>) {
        self.search.insert(key, results).await;
    }

    pub async fn cart(&self, owner: &CartOwner) -> Option<CartView> {
        self.carts.get(owner).await
    }

    pub async fn store_cart(&self, owner: CartOwner, view: CartView) {
        self.carts.insert(owner, view).await;
    }

    pub async fn invalidate_cart(&self, owner: &CartOwner) {
        self.carts.invalidate(owner).await;
    }
}
