//! Search route handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::cache::SearchKey;
use crate::db::CatalogRepository;
use crate::error::Result;
use crate::models::ProductSummary;
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Arc<Vec<ProductSummary>>,
}

/// Case-insensitive product search. Blank queries return nothing.
#[instrument(skip(state), fields(q = %query.q))]
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let key = SearchKey::new(&query.q, limit);

    if key.query.is_empty() {
        return Ok(Json(SearchResponse {
            query: key.query,
            results: Arc::new(Vec::new()),
        }));
    }

    if let Some(results) = state.cache().search(&key).await {
        tracing::debug!("Search cache hit");
        return Ok(Json(SearchResponse {
            query: key.query,
            results,
        }));
    }

    let results = Arc::new(
        CatalogRepository::new(state.pool())
            .search(&key.query, limit)
            .await?,
    );
    state.cache().store_search(key.clone(), Arc::clone(&results)).await;

    Ok(Json(SearchResponse {
        query: key.query,
        results,
    }))
}
