//! Checkout route handler.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use malmequer_core::AddressId;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::Shopper;
use crate::models::{OrderWithItems, ShippingAddress};
use crate::services::checkout::{
    CheckoutError, CheckoutRequest, CheckoutService, ShippingChoice,
};
use crate::state::AppState;

/// Checkout payload. Exactly one of `address_id` and `shipping_address`.
#[derive(Debug, Deserialize)]
pub struct CheckoutBody {
    pub address_id: Option<AddressId>,
    pub shipping_address: Option<ShippingAddress>,
    pub email: Option<String>,
    pub promo_code: Option<String>,
}

impl CheckoutBody {
    fn into_request(self) -> Result<CheckoutRequest> {
        let shipping = match (self.address_id, self.shipping_address) {
            (Some(id), None) => ShippingChoice::Saved(id),
            (None, Some(address)) => ShippingChoice::New(address),
            (Some(_), Some(_)) => {
                return Err(AppError::BadRequest(
                    "give either address_id or shipping_address, not both".to_string(),
                ));
            }
            (None, None) => {
                return Err(AppError::BadRequest(
                    "shipping address is required".to_string(),
                ));
            }
        };
        Ok(CheckoutRequest {
            shipping,
            email: self.email,
            promo_code: self.promo_code,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    #[serde(flatten)]
    pub order: OrderWithItems,
    pub client_secret: Option<String>,
}

/// Place an order for the current cart and start payment.
#[instrument(skip(state, shopper, body))]
pub async fn checkout(
    State(state): State<AppState>,
    shopper: Shopper,
    Json(body): Json<CheckoutBody>,
) -> Result<impl IntoResponse> {
    let request = body.into_request()?;
    let owner = shopper.owner().await?.ok_or(CheckoutError::EmptyCart)?;
    let account_email = shopper.user().map(|u| &u.email);

    let outcome = CheckoutService::new(
        state.pool(),
        state.cache(),
        &state.config().shop,
        state.payments(),
    )
    .place_order(owner, account_email, request)
    .await?;

    add_breadcrumb(
        "checkout",
        "Order placed",
        Some(&[("order_number", outcome.order.order.order_number.as_str())]),
    );

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            order: outcome.order,
            client_secret: outcome.client_secret,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Ana Sousa".to_string(),
            line1: "Rua das Flores 12".to_string(),
            line2: None,
            city: "Porto".to_string(),
            postal_code: "4050-262".to_string(),
            country: "PT".to_string(),
            phone: None,
        }
    }

    #[test]
    fn test_body_needs_one_address() {
        let body = CheckoutBody {
            address_id: None,
            shipping_address: None,
            email: None,
            promo_code: None,
        };
        assert!(matches!(body.into_request(), Err(AppError::BadRequest(_))));

        let body = CheckoutBody {
            address_id: Some(AddressId::new(1)),
            shipping_address: Some(address()),
            email: None,
            promo_code: None,
        };
        assert!(matches!(body.into_request(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_body_with_new_address() {
        let body: CheckoutBody = serde_json::from_value(serde_json::json!({
            "shipping_address": {
                "full_name": "Ana Sousa",
                "line1": "Rua das Flores 12",
                "line2": null,
                "city": "Porto",
                "postal_code": "4050-262",
                "country": "PT",
                "phone": null
            },
            "email": "ana@example.pt",
            "promo_code": "PRIMAVERA10"
        }))
        .unwrap();
        let request = body.into_request().unwrap();
        assert!(matches!(request.shipping, ShippingChoice::New(a) if a == address()));
        assert_eq!(request.promo_code.as_deref(), Some("PRIMAVERA10"));
    }
}
