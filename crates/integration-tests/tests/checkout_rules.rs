//! Cart-to-order rules shared by the storefront checkout and the admin
//! reports: line pricing, guest cart merging, totals and order numbers.

use chrono::NaiveDate;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rust_decimal::Decimal;

use malmequer_core::pricing::{
    OrderTotals, PricingError, ShippingPolicy, cart_subtotal, line_total, unit_price,
};
use malmequer_core::{CartItemId, CurrencyCode, ProductId, StockItemId};
use malmequer_integration_tests::money;
use malmequer_storefront::models::{MergeLine, MergeStep};
use malmequer_storefront::services::cart::{check_stock, plan_cart_merge};
use malmequer_storefront::services::checkout::{
    CheckoutError, chargeable_amount, generate_order_number,
};

fn line(id: i32, product: i32, stock_item: i32, quantity: u32, available: i32) -> MergeLine {
    MergeLine {
        id: CartItemId::new(id),
        product_id: ProductId::new(product),
        stock_item_id: Some(StockItemId::new(stock_item)),
        quantity,
        available: Some(available),
    }
}

#[test]
fn test_cart_with_surcharges_and_promo_code() {
    // Linen shirt in L (+2.00) x2, dress in a premium colour (+5.00) x1.
    let shirt = line_total(unit_price(money("24.90"), Some(money("2.00")), None), 2);
    let dress = line_total(unit_price(money("39.00"), None, Some(money("5.00"))), 1);
    assert_eq!(shirt, money("53.80"));
    assert_eq!(dress, money("44.00"));

    let subtotal = cart_subtotal([shirt, dress]);
    let totals =
        OrderTotals::compute(subtotal, money("0.23"), &ShippingPolicy::default(), Some(10))
            .unwrap();

    assert_eq!(totals.subtotal, money("97.80"));
    assert_eq!(totals.discount, money("9.78"));
    // 88.02 * 0.23 = 20.2446
    assert_eq!(totals.tax, money("20.24"));
    assert_eq!(totals.shipping, Decimal::ZERO);
    assert_eq!(totals.total, money("108.26"));
    assert!(totals.is_consistent());
}

#[test]
fn test_discount_can_bring_order_under_free_shipping() {
    let totals =
        OrderTotals::compute(money("52.00"), Decimal::ZERO, &ShippingPolicy::default(), Some(10))
            .unwrap();
    assert_eq!(totals.discount, money("5.20"));
    assert_eq!(totals.shipping, money("4.99"));
    assert_eq!(totals.total, money("51.79"));
}

#[test]
fn test_full_discount_leaves_nothing_to_charge() {
    let policy = ShippingPolicy::default();
    let totals = OrderTotals::compute(money("20.00"), money("0.23"), &policy, Some(100)).unwrap();
    assert_eq!(totals.total, Decimal::ZERO);
    assert!(totals.is_consistent());

    // Checkout refuses it rather than placing an order no intent can pay.
    assert!(matches!(
        chargeable_amount(&totals, CurrencyCode::EUR),
        Err(CheckoutError::NothingToCharge)
    ));

    let totals = OrderTotals::compute(money("20.00"), money("0.23"), &policy, Some(99)).unwrap();
    assert!(chargeable_amount(&totals, CurrencyCode::EUR).unwrap() > 0);
}

#[test]
fn test_rejected_promo_percentages() {
    for pct in [0, 101, 255] {
        assert_eq!(
            OrderTotals::compute(
                money("10.00"),
                Decimal::ZERO,
                &ShippingPolicy::default(),
                Some(pct),
            ),
            Err(PricingError::InvalidPercentOff(pct))
        );
    }
}

#[test]
fn test_guest_cart_merges_into_user_cart_at_login() {
    let guest = [
        // Same shirt the user already has: summed, capped by stock.
        line(10, 1, 100, 3, 4),
        // New dress: handed over.
        line(11, 2, 200, 1, 5),
        // Sold out since it was added: dropped.
        line(12, 3, 300, 2, 0),
    ];
    let user = [line(1, 1, 100, 2, 4)];

    let steps = plan_cart_merge(&guest, &user);
    assert_eq!(
        steps,
        vec![
            MergeStep::Combine {
                into: CartItemId::new(1),
                quantity: 4,
            },
            MergeStep::Move {
                line: CartItemId::new(11),
                quantity: 1,
            },
        ]
    );

    // Every planned quantity fits the stock it was capped against.
    assert!(check_stock(Some(4), 4).is_ok());
    assert!(check_stock(Some(4), 5).is_err());
}

#[test]
fn test_merge_keeps_user_lines_when_stock_is_already_used_up() {
    let guest = [line(10, 1, 100, 2, 2)];
    let user = [line(1, 1, 100, 2, 2)];
    assert!(plan_cart_merge(&guest, &user).is_empty());
}

#[test]
fn test_order_numbers_are_dated_and_unique_enough() {
    let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
    let mut rng = StdRng::seed_from_u64(7);

    let numbers: Vec<String> = (0..50).map(|_| generate_order_number(date, &mut rng)).collect();
    for number in &numbers {
        assert!(number.starts_with("MQ-20260314-"), "{number}");
        let suffix = &number["MQ-20260314-".len()..];
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    let mut unique = numbers.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), numbers.len());
}
