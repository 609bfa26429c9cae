//! Category route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::db::CatalogRepository;
use crate::error::{AppError, Result};
use crate::models::{Category, CategorySummary, Page, ProductFilter, ProductSort, ProductSummary};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CategoryQuery {
    pub sort: ProductSort,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub category: Category,
    pub products: Page<ProductSummary>,
}

/// All categories with their visible product counts.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<CategorySummary>>> {
    let categories = CatalogRepository::new(state.pool()).list_categories().await?;
    Ok(Json(categories))
}

/// A category and the first page of its products.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<CategoryQuery>,
) -> Result<Json<CategoryResponse>> {
    let catalog = CatalogRepository::new(state.pool());
    let category = catalog
        .get_category_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("category {slug}")))?;

    let filter = ProductFilter {
        category: Some(category.slug.clone()),
        sort: query.sort,
        page: query.page,
        per_page: query.per_page,
        ..ProductFilter::default()
    };
    let (products, total) = catalog.list_products(&filter).await?;

    Ok(Json(CategoryResponse {
        category,
        products: Page::new(products, filter.page(), filter.per_page(), total),
    }))
}
