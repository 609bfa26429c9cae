//! Admin account management (super admins only).

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::db::AdminUserRepository;
use crate::error::Result;
use crate::middleware::RequireSuperAdmin;
use crate::models::{AdminRole, AdminUser, actions};
use crate::services::AdminAuthService;
use crate::services::activity;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateAdminRequest {
    pub email: String,
    pub name: String,
    pub role: AdminRole,
    pub password: String,
}

#[instrument(skip(state, _admin))]
pub async fn index(
    State(state): State<AppState>,
    RequireSuperAdmin(_admin): RequireSuperAdmin,
) -> Result<Json<Vec<AdminUser>>> {
    Ok(Json(AdminUserRepository::new(state.pool()).list_all().await?))
}

#[instrument(skip(state, admin, request), fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireSuperAdmin(admin): RequireSuperAdmin,
    Json(request): Json<CreateAdminRequest>,
) -> Result<impl IntoResponse> {
    let created = AdminAuthService::new(state.pool())
        .create_admin(&request.email, &request.name, request.role, &request.password)
        .await?;
    tracing::info!(new_admin_id = %created.id, role = %created.role, "Admin account created");

    activity::record(
        state.pool(),
        &admin,
        actions::ADMIN_CREATE,
        "admin_user",
        Some(created.id.to_string()),
        json!({ "email": created.email, "role": created.role }),
    )
    .await;

    Ok((StatusCode::CREATED, Json(created)))
}
