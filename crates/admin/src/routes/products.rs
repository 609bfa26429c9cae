//! Product, variant and stock route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use malmequer_core::{ProductId, StockItemId};
use malmequer_storefront::models::{Product, ProductColor, ProductSize, StockItem};

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdminAuth, RequireWriteAccess};
use crate::models::{
    AdminProductDetail, DeleteOutcome, LowStockItem, Page, ProductInput, ProductListItem,
    ProductListQuery, StockAdjustment, StockGridInput, VariantsInput, actions,
};
use crate::services::activity;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct VariantsResponse {
    pub sizes: Vec<ProductSize>,
    pub colors: Vec<ProductColor>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LowStockQuery {
    /// Overrides `LOW_STOCK_THRESHOLD` for this request.
    pub threshold: Option<i32>,
}

#[instrument(skip(state, _admin, query))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<Page<ProductListItem>>> {
    let page = ProductRepository::new(state.pool()).list(&query).await?;
    Ok(Json(page))
}

#[instrument(skip(state, _admin))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Path(id): Path<ProductId>,
) -> Result<Json<AdminProductDetail>> {
    ProductRepository::new(state.pool())
        .detail(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Json(input): Json<ProductInput>,
) -> Result<impl IntoResponse> {
    let valid = input.validate().map_err(AppError::BadRequest)?;
    let product = ProductRepository::new(state.pool()).create(&valid).await?;
    tracing::info!(product_id = %product.id, slug = %product.slug, "Product created");

    activity::record(
        state.pool(),
        &admin,
        actions::PRODUCT_CREATE,
        "product",
        Some(product.id.to_string()),
        json!({ "name": product.name, "slug": product.slug, "price": product.price }),
    )
    .await;

    Ok((StatusCode::CREATED, Json(product)))
}

#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(id): Path<ProductId>,
    Json(input): Json<ProductInput>,
) -> Result<Json<Product>> {
    let valid = input.validate().map_err(AppError::BadRequest)?;
    let product = ProductRepository::new(state.pool()).update(id, &valid).await?;

    activity::record(
        state.pool(),
        &admin,
        actions::PRODUCT_UPDATE,
        "product",
        Some(id.to_string()),
        json!({ "name": product.name, "status": product.status, "price": product.price }),
    )
    .await;

    Ok(Json(product))
}

/// Delete a product; one that appears on orders is archived instead.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(id): Path<ProductId>,
) -> Result<impl IntoResponse> {
    let outcome = ProductRepository::new(state.pool()).delete(id).await?;
    tracing::info!(product_id = %id, ?outcome, "Product removed");

    let action = match outcome {
        DeleteOutcome::Deleted => actions::PRODUCT_DELETE,
        DeleteOutcome::Archived => actions::PRODUCT_ARCHIVE,
    };
    activity::record(
        state.pool(),
        &admin,
        action,
        "product",
        Some(id.to_string()),
        json!({}),
    )
    .await;

    Ok(match outcome {
        DeleteOutcome::Deleted => StatusCode::NO_CONTENT.into_response(),
        DeleteOutcome::Archived => Json(json!({ "outcome": outcome })).into_response(),
    })
}

/// Replace the product's sizes and colors.
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn replace_variants(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(id): Path<ProductId>,
    Json(input): Json<VariantsInput>,
) -> Result<Json<VariantsResponse>> {
    input.validate().map_err(AppError::BadRequest)?;
    let (sizes, colors) = ProductRepository::new(state.pool())
        .replace_variants(id, &input)
        .await?;

    activity::record(
        state.pool(),
        &admin,
        actions::VARIANTS_REPLACE,
        "product",
        Some(id.to_string()),
        json!({
            "sizes": sizes.iter().map(|s| s.label.as_str()).collect::<Vec<_>>(),
            "colors": colors.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
        }),
    )
    .await;

    Ok(Json(VariantsResponse { sizes, colors }))
}

/// Set quantities for a grid of size × color cells.
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn set_stock(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(id): Path<ProductId>,
    Json(input): Json<StockGridInput>,
) -> Result<Json<Vec<StockItem>>> {
    input.validate().map_err(AppError::BadRequest)?;
    let items = ProductRepository::new(state.pool())
        .set_stock(id, &input.items)
        .await?;

    activity::record(
        state.pool(),
        &admin,
        actions::STOCK_SET,
        "product",
        Some(id.to_string()),
        json!({
            "items": items
                .iter()
                .map(|i| json!({ "sku": i.sku, "quantity": i.quantity }))
                .collect::<Vec<_>>(),
        }),
    )
    .await;

    Ok(Json(items))
}

/// Add `delta` (possibly negative) to one stock item, stopping at zero.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn adjust_stock(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path((product_id, stock_item_id)): Path<(ProductId, StockItemId)>,
    Json(input): Json<StockAdjustment>,
) -> Result<Json<StockItem>> {
    let item = ProductRepository::new(state.pool())
        .adjust_stock(product_id, stock_item_id, input.delta)
        .await?;

    activity::record(
        state.pool(),
        &admin,
        actions::STOCK_ADJUST,
        "stock_item",
        Some(stock_item_id.to_string()),
        json!({ "sku": item.sku, "delta": input.delta, "quantity": item.quantity }),
    )
    .await;

    Ok(Json(item))
}

#[instrument(skip(state, _admin, query))]
pub async fn low_stock(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Query(query): Query<LowStockQuery>,
) -> Result<Json<Vec<LowStockItem>>> {
    let threshold = match query.threshold {
        Some(t) if t < 0 => {
            return Err(AppError::BadRequest("threshold must not be negative".to_string()));
        }
        Some(t) => t,
        None => state.config().low_stock_threshold,
    };
    let items = ProductRepository::new(state.pool()).low_stock(threshold).await?;
    Ok(Json(items))
}
