//! Property-based tests for pricing, stock and slug helpers.
//!
//! These use proptest to check invariants over wide input ranges.

use iwanyu_api::{
    entities::OrderStatus,
    services::{
        orders::{merge_lines, order_total, unit_price, OrderLineInput},
        payments::amount_matches,
        products::apply_stock_delta,
        reviews::RatingSummary,
        slugify,
    },
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

// Prices in RWF with up to two decimals
fn price_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..100_000_000, 0u32..100).prop_map(|(whole, cents)| {
        Decimal::from(whole) + Decimal::new(i64::from(cents), 2)
    })
}

fn line_strategy() -> impl Strategy<Value = (Decimal, i32)> {
    (price_strategy(), 1i32..1000)
}

fn status_strategy() -> impl Strategy<Value = OrderStatus> {
    prop_oneof![
        Just(OrderStatus::Pending),
        Just(OrderStatus::Paid),
        Just(OrderStatus::Processing),
        Just(OrderStatus::Shipped),
        Just(OrderStatus::Delivered),
        Just(OrderStatus::Cancelled),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn total_is_sum_of_line_totals(lines in prop::collection::vec(line_strategy(), 0..20)) {
        let expected: Decimal = lines
            .iter()
            .map(|(price, qty)| *price * Decimal::from(*qty))
            .sum();
        prop_assert_eq!(order_total(&lines), expected);
    }

    #[test]
    fn total_does_not_depend_on_line_order(mut lines in prop::collection::vec(line_strategy(), 1..10)) {
        let forward = order_total(&lines);
        lines.reverse();
        prop_assert_eq!(order_total(&lines), forward);
    }

    #[test]
    fn variant_delta_never_lowers_the_price(base in price_strategy(), delta in price_strategy()) {
        prop_assert!(unit_price(base, Some(delta)) >= base);
        prop_assert_eq!(unit_price(base, None), base);
    }

    #[test]
    fn a_price_always_matches_itself(price in price_strategy()) {
        prop_assert!(amount_matches(price, price));
        prop_assert!(!amount_matches(price + Decimal::new(1, 2), price));
    }
}

proptest! {
    #[test]
    fn merging_preserves_total_quantity(
        picks in prop::collection::vec((0usize..4, 1i32..50), 1..30)
    ) {
        let products: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let lines: Vec<OrderLineInput> = picks
            .iter()
            .map(|(idx, qty)| OrderLineInput {
                product_id: products[*idx],
                variant_id: None,
                quantity: *qty,
            })
            .collect();
        let requested: i32 = lines.iter().map(|l| l.quantity).sum();

        let merged = merge_lines(lines).unwrap();

        prop_assert_eq!(merged.iter().map(|l| l.quantity).sum::<i32>(), requested);
        for (i, line) in merged.iter().enumerate() {
            prop_assert!(merged[i + 1..].iter().all(|other| other.product_id != line.product_id));
        }
    }

    #[test]
    fn stock_never_goes_negative(current in 0i32..100_000, delta in -200_000i32..200_000) {
        match apply_stock_delta(current, delta) {
            Some(stock) => {
                prop_assert!(stock >= 0);
                prop_assert_eq!(i64::from(stock), i64::from(current) + i64::from(delta));
            }
            None => prop_assert!(i64::from(current) + i64::from(delta) < 0),
        }
    }

    #[test]
    fn rating_average_stays_in_range(ratings in prop::collection::vec(1i32..=5, 1..200)) {
        let summary = RatingSummary::from_ratings(&ratings);
        prop_assert_eq!(summary.count, ratings.len() as u64);
        prop_assert!(summary.average >= Decimal::ONE);
        prop_assert!(summary.average <= Decimal::from(5));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn slugs_are_url_safe(input in ".{0,80}") {
        let slug = slugify(&input);
        prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        prop_assert!(!slug.starts_with('-') && !slug.ends_with('-'));
        prop_assert!(!slug.contains("--"));
    }

    #[test]
    fn slugify_is_idempotent(input in "[A-Za-z0-9 &'-]{0,60}") {
        let once = slugify(&input);
        prop_assert_eq!(slugify(&once), once.clone());
    }

    #[test]
    fn finished_orders_never_move(from in prop_oneof![Just(OrderStatus::Delivered), Just(OrderStatus::Cancelled)], to in status_strategy()) {
        prop_assert!(!from.can_transition_to(to));
    }

    #[test]
    fn nothing_returns_to_pending(from in status_strategy()) {
        prop_assert!(!from.can_transition_to(OrderStatus::Pending));
    }
}
