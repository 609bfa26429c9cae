//! Order route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::OrderWithItems;
use crate::services::orders::{OrderService, OrderViewer};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OrderLookupQuery {
    /// Email the order was placed with; lets guests look up their orders.
    pub email: Option<String>,
}

fn order_service(state: &AppState) -> OrderService<'_> {
    OrderService::new(state.pool(), state.payments(), state.notifier())
}

/// The customer's orders, newest first.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<OrderWithItems>>> {
    let orders = OrderRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;
    Ok(Json(orders))
}

/// Order detail for its owner, or for a guest with the matching email.
#[instrument(skip(state, user, query))]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(order_number): Path<String>,
    Query(query): Query<OrderLookupQuery>,
) -> Result<Json<OrderWithItems>> {
    let viewer = match (&query.email, &user) {
        (Some(email), _) => OrderViewer::Guest { email },
        (None, Some(user)) => OrderViewer::User(user.id),
        (None, None) => {
            return Err(AppError::Unauthorized(
                "log in or give the order email".to_string(),
            ));
        }
    };

    let order = order_service(&state).get_for(&order_number, viewer).await?;
    Ok(Json(order))
}

/// Cancel a pending or confirmed order.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(order_number): Path<String>,
) -> Result<Json<OrderWithItems>> {
    let order = order_service(&state).cancel(user.id, &order_number).await?;
    Ok(Json(order))
}
