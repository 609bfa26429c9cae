//! Order types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use malmequer_core::{
    Email, OrderId, OrderItemId, OrderStatus, PaymentStatus, ProductId, StockItemId, UserId,
};

/// Shipping address as captured on the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub full_name: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub phone: Option<String>,
}

impl ShippingAddress {
    /// Check that the mandatory fields are filled in.
    ///
    /// # Errors
    ///
    /// Returns the name of the first blank field.
    pub fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("full_name", &self.full_name),
            ("line1", &self.line1),
            ("city", &self.city),
            ("postal_code", &self.postal_code),
            ("country", &self.country),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{field} is required"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: Option<UserId>,
    pub email: Email,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    #[serde(skip_serializing)]
    pub payment_intent_id: Option<String>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub promo_code: Option<String>,
    pub shipping_address: ShippingAddress,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A purchased line, snapshotted at checkout.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub stock_item_id: Option<StockItemId>,
    pub product_name: String,
    pub size_label: Option<String>,
    pub color_name: Option<String>,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Line data inserted with a new order.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub stock_item_id: Option<StockItemId>,
    pub product_name: String,
    pub size_label: Option<String>,
    pub color_name: Option<String>,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Inês Costa".to_string(),
            line1: "Rua das Flores 12".to_string(),
            line2: None,
            city: "Porto".to_string(),
            postal_code: "4050-262".to_string(),
            country: "PT".to_string(),
            phone: None,
        }
    }

    #[test]
    fn test_complete_address_is_valid() {
        assert!(address().validate().is_ok());
    }

    #[test]
    fn test_blank_required_field_is_named() {
        let mut blank_city = address();
        blank_city.city = "   ".to_string();
        assert_eq!(blank_city.validate(), Err("city is required".to_string()));

        let mut no_postcode = address();
        no_postcode.postal_code.clear();
        assert_eq!(no_postcode.validate(), Err("postal_code is required".to_string()));
    }

    #[test]
    fn test_optional_fields_may_be_missing() {
        let json = r#"{"full_name":"Inês Costa","line1":"Rua das Flores 12","city":"Porto","postal_code":"4050-262","country":"PT"}"#;
        let parsed: ShippingAddress = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, address());
    }
}
