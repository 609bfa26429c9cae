//! Product route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::instrument;

use crate::db::CatalogRepository;
use crate::error::{AppError, Result};
use crate::models::{Page, ProductDetail, ProductFilter, ProductSummary};
use crate::state::AppState;

/// List visible products with filters, sorting and pagination.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Page<ProductSummary>>> {
    if let (Some(min), Some(max)) = (filter.min_price, filter.max_price)
        && min > max
    {
        return Err(AppError::BadRequest(
            "min_price must not exceed max_price".to_string(),
        ));
    }

    let (products, total) = CatalogRepository::new(state.pool())
        .list_products(&filter)
        .await?;

    Ok(Json(Page::new(
        products,
        filter.page(),
        filter.per_page(),
        total,
    )))
}

/// Product detail with variants, stock and rating.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProductDetail>> {
    let catalog = CatalogRepository::new(state.pool());
    let product = catalog
        .get_product_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {slug}")))?;

    let category = match product.category_id {
        Some(id) => catalog.get_category(id).await?,
        None => None,
    };
    let sizes = catalog.sizes(product.id).await?;
    let colors = catalog.colors(product.id).await?;
    let stock_items = catalog.stock_items(product.id).await?;
    let rating = catalog.rating_summary(product.id).await?;

    Ok(Json(ProductDetail {
        product,
        category,
        sizes,
        colors,
        stock_items,
        rating,
    }))
}
