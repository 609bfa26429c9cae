//! Cart and order arithmetic.
//!
//! All amounts are [`Decimal`] euros. Every derived component is rounded to
//! cents half away from zero, and [`OrderTotals::total`] is always exactly
//! `subtotal + tax + shipping - discount`.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Round an amount to cents, half away from zero.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Base price plus the optional size and color surcharges.
#[must_use]
pub fn unit_price(
    base: Decimal,
    size_extra: Option<Decimal>,
    color_extra: Option<Decimal>,
) -> Decimal {
    base + size_extra.unwrap_or_default() + color_extra.unwrap_or_default()
}

#[must_use]
pub fn line_total(unit_price: Decimal, quantity: u32) -> Decimal {
    round_money(unit_price * Decimal::from(quantity))
}

/// Sum of line totals.
#[must_use]
pub fn cart_subtotal<I>(line_totals: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    line_totals.into_iter().sum()
}

/// Flat-rate shipping with a free-shipping threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingPolicy {
    pub flat_fee: Decimal,
    pub free_threshold: Decimal,
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self {
            flat_fee: Decimal::new(499, 2),
            free_threshold: Decimal::new(5000, 2),
        }
    }
}

impl ShippingPolicy {
    /// Shipping charged for a (discounted) subtotal.
    ///
    /// Nothing to ship costs nothing; at or above the threshold is free.
    #[must_use]
    pub fn shipping_for(&self, subtotal: Decimal) -> Decimal {
        if subtotal <= Decimal::ZERO || subtotal >= self.free_threshold {
            Decimal::ZERO
        } else {
            round_money(self.flat_fee)
        }
    }
}

/// Errors from totals computation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PricingError {
    #[error("percent off must be between 1 and 100, got {0}")]
    InvalidPercentOff(u8),
    #[error("tax rate must be between 0 and 1")]
    InvalidTaxRate,
    #[error("subtotal cannot be negative")]
    NegativeSubtotal,
}

/// Monetary breakdown of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    /// Compute the breakdown for a cart subtotal.
    ///
    /// The discount is taken off the subtotal first; tax and the shipping
    /// threshold both apply to the discounted amount.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError`] for a negative subtotal, a tax rate outside
    /// `0..=1` or a percentage outside `1..=100`.
    pub fn compute(
        subtotal: Decimal,
        tax_rate: Decimal,
        shipping: &ShippingPolicy,
        percent_off: Option<u8>,
    ) -> Result<Self, PricingError> {
        if subtotal.is_sign_negative() && !subtotal.is_zero() {
            return Err(PricingError::NegativeSubtotal);
        }
        if tax_rate < Decimal::ZERO || tax_rate > Decimal::ONE {
            return Err(PricingError::InvalidTaxRate);
        }

        let subtotal = round_money(subtotal);
        let discount = match percent_off {
            None => Decimal::ZERO,
            Some(pct) if (1..=100).contains(&pct) => {
                round_money(subtotal * Decimal::from(pct) / Decimal::ONE_HUNDRED)
            }
            Some(pct) => return Err(PricingError::InvalidPercentOff(pct)),
        };

        let discounted = subtotal - discount;
        let tax = round_money(discounted * tax_rate);
        let shipping = shipping.shipping_for(discounted);
        let total = subtotal + tax + shipping - discount;

        Ok(Self {
            subtotal,
            discount,
            tax,
            shipping,
            total,
        })
    }

    /// Whether `total` matches its components.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.total == self.subtotal + self.tax + self.shipping - self.discount
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn eur(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    #[test]
    fn test_unit_price_adds_extras() {
        assert_eq!(unit_price(eur(2000), None, None), eur(2000));
        assert_eq!(unit_price(eur(2000), Some(eur(250)), None), eur(2250));
        assert_eq!(
            unit_price(eur(2000), Some(eur(250)), Some(eur(100))),
            eur(2350)
        );
    }

    #[test]
    fn test_line_total_and_subtotal() {
        let lines = [line_total(eur(1999), 2), line_total(eur(500), 3)];
        assert_eq!(lines[0], eur(3998));
        assert_eq!(cart_subtotal(lines), eur(5498));
        assert_eq!(cart_subtotal(Vec::new()), Decimal::ZERO);
    }

    #[test]
    fn test_shipping_threshold() {
        let policy = ShippingPolicy::default();
        assert_eq!(policy.shipping_for(Decimal::ZERO), Decimal::ZERO);
        assert_eq!(policy.shipping_for(eur(4999)), eur(499));
        assert_eq!(policy.shipping_for(eur(5000)), Decimal::ZERO);
    }

    #[test]
    fn test_totals_without_discount() {
        let totals =
            OrderTotals::compute(eur(4000), Decimal::new(23, 2), &ShippingPolicy::default(), None)
                .unwrap();
        assert_eq!(totals.discount, Decimal::ZERO);
        assert_eq!(totals.tax, eur(920));
        assert_eq!(totals.shipping, eur(499));
        assert_eq!(totals.total, eur(5419));
        assert!(totals.is_consistent());
    }

    #[test]
    fn test_discount_can_bring_order_under_free_shipping() {
        let totals = OrderTotals::compute(
            eur(5500),
            Decimal::new(23, 2),
            &ShippingPolicy::default(),
            Some(20),
        )
        .unwrap();
        assert_eq!(totals.discount, eur(1100));
        assert_eq!(totals.tax, eur(1012));
        assert_eq!(totals.shipping, eur(499));
        assert_eq!(totals.total, eur(5500) + eur(1012) + eur(499) - eur(1100));
    }

    #[test]
    fn test_rounding_half_away_from_zero() {
        // 0.05 * 0.23 = 0.0115 -> 0.01; 0.15 * 0.1 = 0.015 -> 0.02
        let a = OrderTotals::compute(eur(5), Decimal::new(23, 2), &ShippingPolicy::default(), None)
            .unwrap();
        assert_eq!(a.tax, eur(1));
        let b = OrderTotals::compute(eur(15), Decimal::new(1, 1), &ShippingPolicy::default(), None)
            .unwrap();
        assert_eq!(b.tax, eur(2));
    }

    #[test]
    fn test_full_discount() {
        let totals = OrderTotals::compute(
            eur(3000),
            Decimal::new(23, 2),
            &ShippingPolicy::default(),
            Some(100),
        )
        .unwrap();
        assert_eq!(totals.total, Decimal::ZERO);
        assert!(totals.is_consistent());
    }

    #[test]
    fn test_invalid_inputs() {
        let policy = ShippingPolicy::default();
        assert_eq!(
            OrderTotals::compute(eur(100), Decimal::new(23, 2), &policy, Some(0)),
            Err(PricingError::InvalidPercentOff(0))
        );
        assert_eq!(
            OrderTotals::compute(eur(100), Decimal::TWO, &policy, None),
            Err(PricingError::InvalidTaxRate)
        );
        assert_eq!(
            OrderTotals::compute(eur(-100), Decimal::ZERO, &policy, None),
            Err(PricingError::NegativeSubtotal)
        );
    }
}
