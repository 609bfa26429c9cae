//! Cart route handlers.
//!
//! Carts belong to the logged-in customer or to the session's guest id. Every
//! handler answers with the full priced cart.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use tracing::instrument;

use malmequer_core::{CartItemId, ColorId, ProductId, SizeId, StockItemId};

use crate::error::Result;
use crate::middleware::Shopper;
use crate::models::CartView;
use crate::services::cart::{CartError, CartService, VariantChoice};
use crate::state::AppState;

const fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    pub stock_item_id: Option<StockItemId>,
    pub size_id: Option<SizeId>,
    pub color_id: Option<ColorId>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCartRequest {
    pub quantity: u32,
}

fn cart_service(state: &AppState) -> CartService<'_> {
    CartService::new(state.pool(), state.cache(), state.config().shop.currency)
}

/// Current cart. Sessions without a cart get an empty one.
#[instrument(skip(state, shopper))]
pub async fn show(State(state): State<AppState>, shopper: Shopper) -> Result<Json<CartView>> {
    let Some(owner) = shopper.owner().await? else {
        return Ok(Json(CartView::empty(state.config().shop.currency)));
    };
    Ok(Json(cart_service(&state).view(owner).await?))
}

/// Add units of a product.
#[instrument(skip(state, shopper))]
pub async fn add(
    State(state): State<AppState>,
    shopper: Shopper,
    Json(request): Json<AddToCartRequest>,
) -> Result<Json<CartView>> {
    let owner = shopper.owner_or_create().await?;
    let variant = VariantChoice {
        stock_item_id: request.stock_item_id,
        size_id: request.size_id,
        color_id: request.color_id,
    };
    let view = cart_service(&state)
        .add(owner, request.product_id, variant, request.quantity)
        .await?;
    Ok(Json(view))
}

/// Set a line's quantity; zero removes it.
#[instrument(skip(state, shopper))]
pub async fn update(
    State(state): State<AppState>,
    shopper: Shopper,
    Path(line_id): Path<CartItemId>,
    Json(request): Json<UpdateCartRequest>,
) -> Result<Json<CartView>> {
    let owner = shopper.owner().await?.ok_or(CartError::LineNotFound)?;
    let view = cart_service(&state)
        .update(owner, line_id, request.quantity)
        .await?;
    Ok(Json(view))
}

#[instrument(skip(state, shopper))]
pub async fn remove(
    State(state): State<AppState>,
    shopper: Shopper,
    Path(line_id): Path<CartItemId>,
) -> Result<Json<CartView>> {
    let owner = shopper.owner().await?.ok_or(CartError::LineNotFound)?;
    Ok(Json(cart_service(&state).remove(owner, line_id).await?))
}

#[instrument(skip(state, shopper))]
pub async fn clear(State(state): State<AppState>, shopper: Shopper) -> Result<Json<CartView>> {
    let Some(owner) = shopper.owner().await? else {
        return Ok(Json(CartView::empty(state.config().shop.currency)));
    };
    Ok(Json(cart_service(&state).clear(owner).await?))
}
