//! Product recommendations from sales aggregates.
//!
//! Ranking is a pure function of aggregate rows; the service loads the rows,
//! ranks them and tops the list up with featured/newest products.

use std::cmp::Ordering;
use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::PgPool;

use malmequer_core::ProductId;

use crate::db::recommendations::{
    BASELINE_DAYS, CoPurchase, ProductSales, RECENT_DAYS, SalesWindow,
};
use crate::db::{CatalogRepository, RecommendationRepository, RepositoryError};
use crate::models::ProductSummary;

pub const DEFAULT_LIMIT: usize = 8;
pub const MAX_LIMIT: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecommendationKind {
    Popular,
    Trending,
    FrequentlyBoughtTogether,
}

impl FromStr for RecommendationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "popular" => Ok(Self::Popular),
            "trending" => Ok(Self::Trending),
            "frequently-bought-together" => Ok(Self::FrequentlyBoughtTogether),
            other => Err(format!("unknown recommendation type: {other}")),
        }
    }
}

/// Products by units sold, best sellers first. Ties go to the lower id.
#[must_use]
pub fn rank_popular(rows: &[ProductSales]) -> Vec<ProductId> {
    let mut rows: Vec<&ProductSales> = rows.iter().filter(|r| r.units > 0).collect();
    rows.sort_by(|a, b| b.units.cmp(&a.units).then(a.product_id.cmp(&b.product_id)));
    rows.into_iter().map(|r| r.product_id).collect()
}

/// Daily sales rate over a window.
fn daily_rate(units: i64, days: i32) -> Decimal {
    Decimal::from(units) / Decimal::from(days)
}

/// Sales velocity: recent daily rate minus baseline daily rate.
#[must_use]
pub fn velocity(window: &SalesWindow) -> Decimal {
    daily_rate(window.recent_units, RECENT_DAYS) - daily_rate(window.baseline_units, BASELINE_DAYS)
}

/// Products with recent sales, fastest accelerating first, then by recent units.
#[must_use]
pub fn rank_trending(rows: &[SalesWindow]) -> Vec<ProductId> {
    let mut rows: Vec<(&SalesWindow, Decimal)> = rows
        .iter()
        .filter(|r| r.recent_units > 0)
        .map(|r| (r, velocity(r)))
        .collect();
    rows.sort_by(|(a, va), (b, vb)| {
        vb.cmp(va)
            .then(b.recent_units.cmp(&a.recent_units))
            .then(a.product_id.cmp(&b.product_id))
    });
    rows.into_iter().map(|(r, _)| r.product_id).collect()
}

/// Products most often bought alongside the anchor product.
#[must_use]
pub fn rank_bought_together(rows: &[CoPurchase], anchor: ProductId) -> Vec<ProductId> {
    let mut rows: Vec<&CoPurchase> = rows
        .iter()
        .filter(|r| r.product_id != anchor && r.orders > 0)
        .collect();
    rows.sort_by(|a, b| match b.orders.cmp(&a.orders) {
        Ordering::Equal => a.product_id.cmp(&b.product_id),
        other => other,
    });
    rows.into_iter().map(|r| r.product_id).collect()
}

/// Put summaries in ranking order, dropping ids that did not load.
#[must_use]
pub fn order_by_rank(
    ranked: &[ProductId],
    mut products: Vec<ProductSummary>,
) -> Vec<ProductSummary> {
    let mut ordered = Vec::with_capacity(ranked.len());
    for id in ranked {
        if let Some(pos) = products.iter().position(|p| p.id == *id) {
            ordered.push(products.swap_remove(pos));
        }
    }
    ordered
}

pub struct RecommendationService<'a> {
    pool: &'a PgPool,
}

impl<'a> RecommendationService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Recommend up to `limit` products.
    ///
    /// `anchor` is the product the shopper is looking at; it is required for
    /// frequently-bought-together and never recommended back.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn recommend(
        &self,
        kind: RecommendationKind,
        anchor: Option<ProductId>,
        limit: usize,
    ) -> Result<Vec<ProductSummary>, RepositoryError> {
        let limit = limit.clamp(1, MAX_LIMIT);
        let repo = RecommendationRepository::new(self.pool);

        let mut ranked = match (kind, anchor) {
            (RecommendationKind::Popular, _) => rank_popular(&repo.units_sold().await?),
            (RecommendationKind::Trending, _) => rank_trending(&repo.sales_windows().await?),
            (RecommendationKind::FrequentlyBoughtTogether, Some(anchor)) => {
                rank_bought_together(&repo.bought_together(anchor).await?, anchor)
            }
            (RecommendationKind::FrequentlyBoughtTogether, None) => Vec::new(),
        };
        if let Some(anchor) = anchor {
            ranked.retain(|id| *id != anchor);
        }
        ranked.truncate(limit);

        let catalog = CatalogRepository::new(self.pool);
        let mut products = order_by_rank(&ranked, catalog.summaries_by_ids(&ranked).await?);

        if products.len() < limit {
            let mut exclude: Vec<ProductId> = products.iter().map(|p| p.id).collect();
            exclude.extend(anchor);
            let missing = i64::try_from(limit - products.len()).unwrap_or(i64::MAX);
            let fallback = catalog.featured_or_newest(missing, &exclude).await?;
            tracing::debug!(
                ?kind,
                ranked = products.len(),
                fallback = fallback.len(),
                "Topping up recommendations"
            );
            products.extend(fallback);
        }

        Ok(products)
    }
}
