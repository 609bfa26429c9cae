//! Recommendation route handler.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use malmequer_core::ProductId;

use crate::error::{AppError, Result};
use crate::models::ProductSummary;
use crate::services::recommendations::{DEFAULT_LIMIT, RecommendationKind, RecommendationService};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub product_id: Option<ProductId>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    pub products: Vec<ProductSummary>,
}

/// Popular, trending or frequently-bought-together products.
#[instrument(skip(state))]
pub async fn recommendations(
    State(state): State<AppState>,
    Query(query): Query<RecommendationQuery>,
) -> Result<Json<RecommendationResponse>> {
    let kind = match query.kind.as_deref() {
        None | Some("") => RecommendationKind::Popular,
        Some(raw) => raw.parse().map_err(AppError::BadRequest)?,
    };
    if kind == RecommendationKind::FrequentlyBoughtTogether && query.product_id.is_none() {
        return Err(AppError::BadRequest(
            "product_id is required for frequently-bought-together".to_string(),
        ));
    }

    let products = RecommendationService::new(state.pool())
        .recommend(kind, query.product_id, query.limit.unwrap_or(DEFAULT_LIMIT))
        .await?;

    Ok(Json(RecommendationResponse { kind, products }))
}
