//! Account route handlers: saved addresses and notification settings.
//!
//! These routes require authentication.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::instrument;

use malmequer_core::AddressId;
use malmequer_core::notifications::NotificationPreferences;

use crate::db::{AddressRepository, NotificationSettingsRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{Address, AddressInput};
use crate::state::AppState;

fn validate_address(input: &AddressInput) -> Result<()> {
    input.address.validate().map_err(AppError::BadRequest)
}

// =============================================================================
// Addresses
// =============================================================================

/// Saved addresses, default first.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn addresses(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Address>>> {
    Ok(Json(AddressRepository::new(state.pool()).list(user.id).await?))
}

#[instrument(skip(state, user, input), fields(user_id = %user.id))]
pub async fn create_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(input): Json<AddressInput>,
) -> Result<impl IntoResponse> {
    validate_address(&input)?;
    let address = AddressRepository::new(state.pool())
        .create(user.id, &input)
        .await?;
    Ok((StatusCode::CREATED, Json(address)))
}

#[instrument(skip(state, user, input), fields(user_id = %user.id))]
pub async fn update_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
    Json(input): Json<AddressInput>,
) -> Result<Json<Address>> {
    validate_address(&input)?;
    let address = AddressRepository::new(state.pool())
        .update(user.id, id, &input)
        .await?;
    Ok(Json(address))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
) -> Result<StatusCode> {
    AddressRepository::new(state.pool()).delete(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Notification settings
// =============================================================================

/// Current settings; a row with defaults is created on first read.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn notification_settings(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<NotificationPreferences>> {
    let prefs = NotificationSettingsRepository::new(state.pool())
        .get_or_create(user.id)
        .await?;
    Ok(Json(prefs))
}

/// Replace the settings. Omitted flags take their defaults.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn update_notification_settings(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(prefs): Json<NotificationPreferences>,
) -> Result<Json<NotificationPreferences>> {
    let saved = NotificationSettingsRepository::new(state.pool())
        .upsert(user.id, &prefs)
        .await?;
    tracing::info!(?saved, "Notification settings updated");
    Ok(Json(saved))
}
