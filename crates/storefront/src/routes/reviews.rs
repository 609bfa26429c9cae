//! Product review route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use crate::db::{CatalogRepository, ReviewRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{Product, Review};
use crate::state::AppState;

const MAX_TITLE_LEN: usize = 120;
const MAX_BODY_LEN: usize = 5000;

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub rating: i16,
    pub title: Option<String>,
    pub body: Option<String>,
}

impl ReviewRequest {
    /// Check the rating range and text lengths.
    fn validate(&self) -> Result<()> {
        if !(1..=5).contains(&self.rating) {
            return Err(AppError::BadRequest("rating must be between 1 and 5".to_string()));
        }
        if self.title.as_deref().is_some_and(|t| t.chars().count() > MAX_TITLE_LEN) {
            return Err(AppError::BadRequest("title is too long".to_string()));
        }
        if self.body.as_deref().is_some_and(|b| b.chars().count() > MAX_BODY_LEN) {
            return Err(AppError::BadRequest("review is too long".to_string()));
        }
        Ok(())
    }
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

async fn product_by_slug(state: &AppState, slug: &str) -> Result<Product> {
    CatalogRepository::new(state.pool())
        .get_product_by_slug(slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {slug}")))
}

/// Reviews for a product, newest first.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Vec<Review>>> {
    let product = product_by_slug(&state, &slug).await?;
    let reviews = ReviewRepository::new(state.pool())
        .list_for_product(product.id)
        .await?;
    Ok(Json(reviews))
}

/// Review a product. One review per customer per product.
#[instrument(skip(state, user, request), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(slug): Path<String>,
    Json(request): Json<ReviewRequest>,
) -> Result<impl IntoResponse> {
    request.validate()?;
    let product = product_by_slug(&state, &slug).await?;

    let review = ReviewRepository::new(state.pool())
        .create(
            product.id,
            user.id,
            request.rating,
            non_blank(request.title.as_deref()),
            non_blank(request.body.as_deref()),
        )
        .await?;
    tracing::info!(review_id = %review.id, rating = review.rating, "Review posted");

    Ok((StatusCode::CREATED, Json(review)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(rating: i16) -> ReviewRequest {
        ReviewRequest {
            rating,
            title: Some("Lovely linen".to_string()),
            body: None,
        }
    }

    #[test]
    fn test_rating_range() {
        assert!(request(0).validate().is_err());
        assert!(request(1).validate().is_ok());
        assert!(request(5).validate().is_ok());
        assert!(request(6).validate().is_err());
    }

    #[test]
    fn test_long_title_rejected() {
        let mut req = request(4);
        req.title = Some("x".repeat(MAX_TITLE_LEN + 1));
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_blank_text_dropped() {
        assert_eq!(non_blank(Some("  ")), None);
        assert_eq!(non_blank(Some(" Great ")), Some("Great"));
        assert_eq!(non_blank(None), None);
    }
}
