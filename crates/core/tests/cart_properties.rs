//! Property tests for cart normalization and order totals.

#![allow(clippy::unwrap_used)]

use chopho_core::cart::{MAX_QUANTITY, PLACEHOLDER_PRODUCT_NAME, normalize_cart_item};
use chopho_core::{CartItemInput, CheckoutDraft, Voucher};
use proptest::prelude::*;
use rust_decimal::Decimal;
use serde_json::{Value, json};

// =============================================================================
// Strategies
// =============================================================================

/// Anything a widget might put in a numeric field.
fn arb_loose_number() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::from),
        any::<u64>().prop_map(Value::from),
        any::<f64>().prop_map(|f| json!(f)),
        "-?[0-9]{1,40}".prop_map(Value::from),
        "[0-9]{1,6}\\.[0-9]{1,4}".prop_map(Value::from),
        "[a-z ]{0,8}".prop_map(Value::from),
        Just(Value::Null),
        Just(json!([])),
    ]
}

/// A cart line with no product data at all.
fn arb_productless_line() -> impl Strategy<Value = Value> {
    (
        proptest::option::of(arb_loose_number()),
        proptest::option::of(arb_loose_number()),
    )
        .prop_map(|(id, quantity)| {
            let mut line = serde_json::Map::new();
            if let Some(id) = id {
                line.insert("id".to_string(), id);
            }
            if let Some(quantity) = quantity {
                line.insert("quantity".to_string(), quantity);
            }
            Value::Object(line)
        })
}

/// A cart line with loosely typed prices and quantity.
fn arb_priced_line() -> impl Strategy<Value = Value> {
    (
        arb_loose_number(),
        arb_loose_number(),
        proptest::option::of(arb_loose_number()),
        proptest::option::of(arb_loose_number()),
    )
        .prop_map(|(quantity, price, sale_price, variant_price)| {
            json!({
                "quantity": quantity,
                "product": { "id": 1, "name": "Áo", "price": price, "sale_price": sale_price },
                "variant": { "id": 2, "price": variant_price },
            })
        })
}

fn normalize(value: Value) -> chopho_core::CartItem {
    let input: CartItemInput = serde_json::from_value(value).unwrap();
    normalize_cart_item(input)
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    /// Lines without a product always get the placeholder snapshot.
    #[test]
    fn test_missing_product_always_yields_placeholder(line in arb_productless_line()) {
        let item = normalize(line);
        prop_assert_eq!(item.product.name.as_str(), PLACEHOLDER_PRODUCT_NAME);
        prop_assert!(item.product.image.is_empty());
        prop_assert_eq!(item.product.price, Decimal::ZERO);
        prop_assert!(item.variant.is_none());
        prop_assert!((1..=MAX_QUANTITY).contains(&item.quantity));
    }

    /// The first price present wins: variant sale, variant, product sale, product.
    #[test]
    fn test_effective_price_follows_resolution_order(
        product_price in 0u32..1_000_000,
        product_sale in proptest::option::of(0u32..1_000_000),
        variant_price in proptest::option::of(0u32..1_000_000),
        variant_sale in proptest::option::of(0u32..1_000_000),
    ) {
        let item = normalize(json!({
            "quantity": 1,
            "product": { "id": 1, "price": product_price, "sale_price": product_sale },
            "variant": { "id": 2, "price": variant_price, "sale_price": variant_sale },
        }));

        let expected = variant_sale
            .or(variant_price)
            .or(product_sale)
            .unwrap_or(product_price);
        prop_assert_eq!(item.unit_price(), Decimal::from(expected));
    }

    /// Totals never panic and never go negative, whatever the widgets send.
    #[test]
    fn test_summary_is_total_for_any_cart(
        lines in proptest::collection::vec(arb_priced_line(), 0..6),
        discount in 0u64..10_000_000,
        shipping in 0u32..100_000,
    ) {
        let mut draft = CheckoutDraft::new();
        draft
            .replace_items(
                lines
                    .into_iter()
                    .map(|line| serde_json::from_value(line).unwrap())
                    .collect(),
            )
            .unwrap();
        draft
            .apply_voucher(Voucher {
                code: "GIAM".to_string(),
                discount: Decimal::from(discount),
                free_shipping: false,
                min_order_value: None,
            })
            .unwrap();

        let summary = draft.summary(Decimal::from(shipping));
        prop_assert!(summary.total >= Decimal::ZERO);
        prop_assert!(summary.discount <= summary.subtotal);
        prop_assert_eq!(
            summary.subtotal,
            draft.items.iter().map(chopho_core::CartItem::line_total).sum::<Decimal>()
        );
        for item in &draft.items {
            prop_assert!((1..=MAX_QUANTITY).contains(&item.quantity));
            prop_assert!(item.unit_price() >= Decimal::ZERO);
        }
    }
}
