//! Activity log route handler.

use axum::{
    Json,
    extract::{Query, State},
};
use tracing::instrument;

use crate::db::ActivityLogRepository;
use crate::error::Result;
use crate::middleware::RequireAdminAuth;
use crate::models::{ActivityEntry, ActivityQuery};
use crate::state::AppState;

/// Newest entries first, optionally for one action.
#[instrument(skip(state, _admin, query))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Vec<ActivityEntry>>> {
    let entries = ActivityLogRepository::new(state.pool()).list(&query).await?;
    Ok(Json(entries))
}
