//! Back-office order route handlers.
//!
//! Orders are addressed by order number, as on the storefront.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::instrument;

use malmequer_storefront::models::OrderWithItems;

use crate::db::AdminOrderRepository;
use crate::error::Result;
use crate::middleware::{RequireAdminAuth, RequireWriteAccess};
use crate::models::{OrderListItem, OrderListQuery, Page, StatusUpdate};
use crate::services::AdminOrderService;
use crate::state::AppState;

fn order_service(state: &AppState) -> AdminOrderService<'_> {
    AdminOrderService::new(state.pool(), state.notifier())
}

#[instrument(skip(state, _admin, query))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Page<OrderListItem>>> {
    let page = AdminOrderRepository::new(state.pool()).list(&query).await?;
    Ok(Json(page))
}

#[instrument(skip(state, _admin))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Path(order_number): Path<String>,
) -> Result<Json<OrderWithItems>> {
    Ok(Json(order_service(&state).get(&order_number).await?))
}

#[instrument(skip(state, admin, update), fields(admin_id = %admin.id, status = %update.status))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(order_number): Path<String>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<OrderWithItems>> {
    let order = order_service(&state)
        .update_status(&admin, &order_number, update.status)
        .await?;
    Ok(Json(order))
}

/// Mark an order paid after receiving money outside the processor.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn accept_payment(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(order_number): Path<String>,
) -> Result<Json<OrderWithItems>> {
    let order = order_service(&state)
        .accept_payment(&admin, &order_number)
        .await?;
    Ok(Json(order))
}
