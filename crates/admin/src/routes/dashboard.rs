//! Dashboard route handler.

use axum::{Json, extract::State};
use tracing::instrument;

use crate::db::DashboardRepository;
use crate::db::dashboard::DashboardStats;
use crate::error::Result;
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;

#[instrument(skip(state, _admin))]
pub async fn stats(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
) -> Result<Json<DashboardStats>> {
    let stats = DashboardRepository::new(state.pool())
        .stats(state.config().low_stock_threshold)
        .await?;
    Ok(Json(stats))
}
