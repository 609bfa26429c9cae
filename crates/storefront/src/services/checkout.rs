//! Checkout: turn a cart into an order and a payment intent.
//!
//! Stock is reserved, the order is written and the cart is cleared in one
//! transaction. The payment intent is created after commit.

use chrono::{NaiveDate, Utc};
use rand::Rng;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use malmequer_core::pricing::{OrderTotals, PricingError, line_total, unit_price};
use malmequer_core::{AddressId, CurrencyCode, Email, EmailError, Price, UserId};

use super::payments::{PaymentClient, PaymentError};
use crate::cache::StoreCache;
use crate::config::ShopConfig;
use crate::db::carts::{clear_lines, fetch_lines};
use crate::db::orders::{NewOrder, decrement_stock, insert_item, insert_order};
use crate::db::{AddressRepository, OrderRepository, PromoCodeRepository, RepositoryError};
use crate::models::{CartLine, CartOwner, NewOrderItem, OrderWithItems, ShippingAddress};

const ORDER_NUMBER_PREFIX: &str = "MQ";
const ORDER_SUFFIX_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const ORDER_SUFFIX_LEN: usize = 6;

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("your cart is empty")]
    EmptyCart,

    #[error("an email address is required")]
    EmailRequired,

    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("{0}")]
    InvalidAddress(String),

    #[error("address not found")]
    AddressNotFound,

    #[error("promo code is invalid or expired")]
    InvalidPromoCode,

    #[error("order total must be greater than zero")]
    NothingToCharge,

    #[error("{product} has only {available} left in stock")]
    OutOfStock { product: String, available: u32 },

    #[error("pricing error: {0}")]
    Pricing(#[from] PricingError),

    #[error("payment error: {0}")]
    Payment(#[from] PaymentError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Where the order ships to.
#[derive(Debug, Clone)]
pub enum ShippingChoice {
    Saved(AddressId),
    New(ShippingAddress),
}

/// Everything the customer submits at checkout.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub shipping: ShippingChoice,
    pub email: Option<String>,
    pub promo_code: Option<String>,
}

/// The placed order and what the client needs to collect payment.
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub order: OrderWithItems,
    pub client_secret: Option<String>,
}

/// `MQ-YYYYMMDD-XXXXXX` with a random uppercase alphanumeric suffix.
#[must_use]
pub fn generate_order_number<R: Rng + ?Sized>(date: NaiveDate, rng: &mut R) -> String {
    let suffix: String = (0..ORDER_SUFFIX_LEN)
        .map(|_| {
            let index = rng.random_range(0..ORDER_SUFFIX_ALPHABET.len());
            ORDER_SUFFIX_ALPHABET.get(index).copied().map_or('0', char::from)
        })
        .collect();
    format!("{ORDER_NUMBER_PREFIX}-{}-{suffix}", date.format("%Y%m%d"))
}

/// Amount to collect from the processor, in minor units.
///
/// # Errors
///
/// Returns `CheckoutError::NothingToCharge` when the total is not positive.
pub fn chargeable_amount(
    totals: &OrderTotals,
    currency: CurrencyCode,
) -> Result<i64, CheckoutError> {
    let amount = Price::new(totals.total, currency)
        .to_minor_units()
        .ok_or(PaymentError::InvalidAmount)?;
    if amount <= 0 {
        return Err(CheckoutError::NothingToCharge);
    }
    Ok(amount)
}

/// Snapshot a priced cart line as an order line.
///
/// # Errors
///
/// Returns `CheckoutError::OutOfStock` if the quantity does not fit in the
/// database column.
pub fn order_item_from_line(line: &CartLine) -> Result<NewOrderItem, CheckoutError> {
    let unit = unit_price(line.base_price, line.size_extra, line.color_extra);
    let quantity = i32::try_from(line.quantity).map_err(|_| CheckoutError::OutOfStock {
        product: line.product_name.clone(),
        available: 0,
    })?;
    Ok(NewOrderItem {
        product_id: line.product_id,
        stock_item_id: line.stock_item_id,
        product_name: line.product_name.clone(),
        size_label: line.size_label.clone(),
        color_name: line.color_name.clone(),
        unit_price: unit,
        quantity,
        line_total: line_total(unit, line.quantity),
    })
}

pub struct CheckoutService<'a> {
    pool: &'a PgPool,
    cache: &'a StoreCache,
    shop: &'a ShopConfig,
    payments: &'a PaymentClient,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        cache: &'a StoreCache,
        shop: &'a ShopConfig,
        payments: &'a PaymentClient,
    ) -> Self {
        Self {
            pool,
            cache,
            shop,
            payments,
        }
    }

    /// Place an order for the owner's cart.
    ///
    /// `account_email` is the logged-in user's address; guests must supply
    /// one in the request.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart`, `CheckoutError::OutOfStock`,
    /// `CheckoutError::NothingToCharge` and the validation variants before
    /// anything is committed. Returns
    /// `CheckoutError::Payment` if the order was placed but the payment
    /// intent could not be created.
    #[instrument(skip(self, request, account_email), fields(owner = ?owner))]
    pub async fn place_order(
        &self,
        owner: CartOwner,
        account_email: Option<&Email>,
        request: CheckoutRequest,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        let email = match (request.email.as_deref().map(str::trim), account_email) {
            (Some(given), _) if !given.is_empty() => Email::parse(given)?,
            (_, Some(account)) => account.clone(),
            _ => return Err(CheckoutError::EmailRequired),
        };

        let address = self.resolve_address(owner.user_id(), request.shipping).await?;
        address.validate().map_err(CheckoutError::InvalidAddress)?;

        let promo = match request.promo_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => Some(
                PromoCodeRepository::new(self.pool)
                    .find_active(code)
                    .await?
                    .ok_or(CheckoutError::InvalidPromoCode)?,
            ),
            _ => None,
        };
        let percent_off = match &promo {
            Some(p) => Some(p.percent().ok_or(CheckoutError::InvalidPromoCode)?),
            None => None,
        };

        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let lines = fetch_lines(&mut *tx, owner).await?;
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            let item = order_item_from_line(line)?;
            if let Some(stock_item_id) = line.stock_item_id
                && !decrement_stock(&mut *tx, stock_item_id, item.quantity).await?
            {
                return Err(CheckoutError::OutOfStock {
                    product: line.product_name.clone(),
                    available: super::cart::stock_limit(line.available).unwrap_or(0),
                });
            }
            items.push(item);
        }

        let subtotal =
            malmequer_core::pricing::cart_subtotal(items.iter().map(|i| i.line_total));
        let totals =
            OrderTotals::compute(subtotal, self.shop.tax_rate, &self.shop.shipping, percent_off)?;
        // Dropping the transaction here releases the reserved stock.
        let amount = chargeable_amount(&totals, self.shop.currency)?;

        let order_number = generate_order_number(Utc::now().date_naive(), &mut rand::rng());
        let order = insert_order(
            &mut *tx,
            &NewOrder {
                order_number: &order_number,
                user_id: owner.user_id(),
                email: &email,
                totals: &totals,
                promo_code: promo.as_ref().map(|p| p.code.as_str()),
                shipping_address: &address,
            },
        )
        .await?;

        let mut order_items = Vec::with_capacity(items.len());
        for item in &items {
            order_items.push(insert_item(&mut *tx, order.id, item).await?);
        }

        clear_lines(&mut *tx, owner).await?;
        tx.commit().await.map_err(RepositoryError::from)?;
        self.cache.invalidate_cart(&owner).await;

        tracing::info!(
            order_number = %order.order_number,
            total = %order.total,
            lines = order_items.len(),
            "Order placed"
        );

        let mut placed = OrderWithItems {
            order,
            items: order_items,
        };

        let intent = self
            .payments
            .create_payment_intent(
                amount,
                self.shop.currency,
                &placed.order.order_number,
                email.as_str(),
            )
            .await?;
        OrderRepository::new(self.pool)
            .set_payment_intent(placed.order.id, &intent.id)
            .await?;
        placed.order.payment_intent_id = Some(intent.id);

        Ok(CheckoutOutcome {
            order: placed,
            client_secret: intent.client_secret,
        })
    }

    async fn resolve_address(
        &self,
        user_id: Option<UserId>,
        choice: ShippingChoice,
    ) -> Result<ShippingAddress, CheckoutError> {
        match choice {
            ShippingChoice::New(address) => Ok(address),
            ShippingChoice::Saved(id) => {
                let user_id = user_id.ok_or(CheckoutError::AddressNotFound)?;
                let address = AddressRepository::new(self.pool)
                    .get(user_id, id)
                    .await?
                    .ok_or(CheckoutError::AddressNotFound)?;
                Ok(ShippingAddress::from(&address))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use malmequer_core::{CartItemId, ProductId, StockItemId};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rust_decimal::Decimal;

    #[test]
    fn test_order_number_format() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let number = generate_order_number(date, &mut rng);

        assert_eq!(number.len(), "MQ-20250307-XXXXXX".len());
        assert!(number.starts_with("MQ-20250307-"));
        let suffix = &number["MQ-20250307-".len()..];
        assert!(suffix.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_order_numbers_vary() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let a = generate_order_number(date, &mut rng);
        let b = generate_order_number(date, &mut rng);
        assert_ne!(a, b);
    }

    #[test]
    fn test_order_item_snapshot() {
        let line = CartLine {
            id: CartItemId::new(1),
            product_id: ProductId::new(3),
            product_name: "Linen Shirt".to_string(),
            product_slug: "linen-shirt".to_string(),
            image_url: None,
            base_price: Decimal::new(2990, 2),
            stock_item_id: Some(StockItemId::new(12)),
            size_label: Some("M".to_string()),
            size_extra: None,
            color_name: Some("Sand".to_string()),
            color_extra: Some(Decimal::new(500, 2)),
            quantity: 2,
            available: Some(4),
        };

        let item = order_item_from_line(&line).unwrap();
        assert_eq!(item.unit_price, Decimal::new(3490, 2));
        assert_eq!(item.line_total, Decimal::new(6980, 2));
        assert_eq!(item.quantity, 2);
        assert_eq!(item.size_label.as_deref(), Some("M"));
        assert_eq!(item.color_name.as_deref(), Some("Sand"));
    }

    #[test]
    fn test_chargeable_amount() {
        let policy = malmequer_core::pricing::ShippingPolicy::default();
        let totals =
            OrderTotals::compute(Decimal::new(3000, 2), Decimal::new(23, 2), &policy, Some(10))
                .unwrap();
        // 27.00 + 6.21 tax + 4.99 shipping
        assert_eq!(chargeable_amount(&totals, CurrencyCode::EUR).unwrap(), 3820);
    }

    #[test]
    fn test_fully_discounted_order_is_refused() {
        let policy = malmequer_core::pricing::ShippingPolicy::default();
        let totals =
            OrderTotals::compute(Decimal::new(3000, 2), Decimal::new(23, 2), &policy, Some(100))
                .unwrap();
        assert_eq!(totals.total, Decimal::ZERO);
        assert!(matches!(
            chargeable_amount(&totals, CurrencyCode::EUR),
            Err(CheckoutError::NothingToCharge)
        ));
    }
}
