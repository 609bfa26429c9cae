//! Category route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use tracing::instrument;

use malmequer_core::CategoryId;
use malmequer_storefront::models::Category;

use crate::db::CategoryRepository;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdminAuth, RequireWriteAccess};
use crate::models::{AdminCategory, CategoryInput, actions};
use crate::services::activity;
use crate::state::AppState;

#[instrument(skip(state, _admin))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
) -> Result<Json<Vec<AdminCategory>>> {
    Ok(Json(CategoryRepository::new(state.pool()).list().await?))
}

#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Json(input): Json<CategoryInput>,
) -> Result<impl IntoResponse> {
    let valid = input.validate(None).map_err(AppError::BadRequest)?;
    let category = CategoryRepository::new(state.pool()).create(&valid).await?;

    activity::record(
        state.pool(),
        &admin,
        actions::CATEGORY_CREATE,
        "category",
        Some(category.id.to_string()),
        json!({ "name": category.name, "slug": category.slug }),
    )
    .await;

    Ok((StatusCode::CREATED, Json(category)))
}

#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(id): Path<CategoryId>,
    Json(input): Json<CategoryInput>,
) -> Result<Json<Category>> {
    let valid = input.validate(Some(id)).map_err(AppError::BadRequest)?;
    let category = CategoryRepository::new(state.pool()).update(id, &valid).await?;

    activity::record(
        state.pool(),
        &admin,
        actions::CATEGORY_UPDATE,
        "category",
        Some(id.to_string()),
        json!({ "name": category.name, "slug": category.slug, "parent_id": category.parent_id }),
    )
    .await;

    Ok(Json(category))
}

/// Delete a category; refused with 409 while products use it.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode> {
    CategoryRepository::new(state.pool()).delete(id).await?;
    activity::record(
        state.pool(),
        &admin,
        actions::CATEGORY_DELETE,
        "category",
        Some(id.to_string()),
        json!({}),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}
