//! Account data: addresses, reviews and wishlist entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use malmequer_core::{AddressId, ProductId, ReviewId, UserId, WishlistItemId};

use super::catalog::ProductSummary;
use super::order::ShippingAddress;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Address {
    pub id: AddressId,
    pub full_name: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub phone: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Address> for ShippingAddress {
    fn from(address: &Address) -> Self {
        Self {
            full_name: address.full_name.clone(),
            line1: address.line1.clone(),
            line2: address.line2.clone(),
            city: address.city.clone(),
            postal_code: address.postal_code.clone(),
            country: address.country.clone(),
            phone: address.phone.clone(),
        }
    }
}

/// Create/update payload for an address.
#[derive(Debug, Clone, Deserialize)]
pub struct AddressInput {
    #[serde(flatten)]
    pub address: ShippingAddress,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub author_name: Option<String>,
    pub rating: i16,
    pub title: Option<String>,
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WishlistEntry {
    pub id: WishlistItemId,
    pub product: ProductSummary,
    pub added_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_input_is_flat() {
        let json = r#"{"full_name":"Rui Lopes","line1":"Av. da Liberdade 1","city":"Lisboa","postal_code":"1250-096","country":"PT","is_default":true}"#;
        let input: AddressInput = serde_json::from_str(json).unwrap();
        assert!(input.is_default);
        assert_eq!(input.address.city, "Lisboa");
        assert!(input.address.validate().is_ok());
    }

    #[test]
    fn test_address_input_defaults_to_not_default() {
        let json = r#"{"full_name":"Rui Lopes","line1":"Av. da Liberdade 1","city":"Lisboa","postal_code":"1250-096","country":"PT"}"#;
        let input: AddressInput = serde_json::from_str(json).unwrap();
        assert!(!input.is_default);
    }
}
