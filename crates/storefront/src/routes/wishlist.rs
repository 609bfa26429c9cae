//! Wishlist route handlers. Guests get a wishlist tied to their session.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use malmequer_core::ProductId;

use crate::db::{CatalogRepository, WishlistRepository};
use crate::error::{AppError, Result};
use crate::middleware::Shopper;
use crate::models::WishlistEntry;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WishlistRequest {
    pub product_id: ProductId,
}

#[instrument(skip(state, shopper))]
pub async fn index(
    State(state): State<AppState>,
    shopper: Shopper,
) -> Result<Json<Vec<WishlistEntry>>> {
    let Some(owner) = shopper.owner().await? else {
        return Ok(Json(Vec::new()));
    };
    Ok(Json(WishlistRepository::new(state.pool()).list(owner).await?))
}

/// Add a product. Adding it twice is a no-op answered with 200.
#[instrument(skip(state, shopper))]
pub async fn add(
    State(state): State<AppState>,
    shopper: Shopper,
    Json(request): Json<WishlistRequest>,
) -> Result<impl IntoResponse> {
    CatalogRepository::new(state.pool())
        .get_product(request.product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("product".to_string()))?;

    let owner = shopper.owner_or_create().await?;
    let repo = WishlistRepository::new(state.pool());
    let created = repo.add(owner, request.product_id).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(repo.list(owner).await?)))
}

#[instrument(skip(state, shopper))]
pub async fn remove(
    State(state): State<AppState>,
    shopper: Shopper,
    Path(product_id): Path<ProductId>,
) -> Result<StatusCode> {
    let owner = shopper
        .owner()
        .await?
        .ok_or_else(|| AppError::NotFound("wishlist item".to_string()))?;
    if WishlistRepository::new(state.pool())
        .remove(owner, product_id)
        .await?
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("wishlist item".to_string()))
    }
}
