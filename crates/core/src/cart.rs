//! Cart line items and normalization of widget payloads.
//!
//! Cart lines reach the checkout from several widgets (product page "buy
//! now", the cart drawer, re-order links) and each of them shapes the
//! product snapshot a little differently: nested `product` objects or
//! flattened `product_*` fields, numbers as strings, a single image URL or a
//! list of image objects. [`CartItemInput`] keeps that distinction in the
//! type system and [`normalize_cart_item`] maps every raw shape onto the
//! canonical [`CartItem`] with a default for every field, so downstream code
//! never has to guard against a missing product.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{CartItemId, ProductId, VariantId};

/// Display name used when a cart line carries no product name.
pub const PLACEHOLDER_PRODUCT_NAME: &str = "Sản phẩm";

/// Largest unit price accepted from a widget, in dong.
pub const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Largest quantity accepted for one line.
pub const MAX_QUANTITY: u32 = 10_000;

/// One product/variant line in the checkout draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    /// Always at least 1 after normalization.
    pub quantity: u32,
    pub product: ProductSnapshot,
    #[serde(default)]
    pub variant: Option<VariantOverride>,
}

/// Product data captured at the time the item was put in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    pub image: Vec<String>,
    pub price: Decimal,
    #[serde(default)]
    pub sale_price: Option<Decimal>,
}

/// Variant selection with optional price overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantOverride {
    pub id: VariantId,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub sale_price: Option<Decimal>,
}

/// A cart line as received from a widget.
///
/// Deserialization tries the canonical shape first; anything that does not
/// match it exactly is kept as raw JSON for [`normalize_cart_item`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CartItemInput {
    Normalized(CartItem),
    Raw(Value),
}

impl ProductSnapshot {
    /// Snapshot used when a cart line carries no product at all.
    #[must_use]
    pub fn placeholder() -> Self {
        Self {
            id: ProductId::default(),
            name: PLACEHOLDER_PRODUCT_NAME.to_string(),
            image: Vec::new(),
            price: Decimal::ZERO,
            sale_price: None,
        }
    }

    /// First image, if any.
    #[must_use]
    pub fn thumbnail(&self) -> Option<&str> {
        self.image.first().map(String::as_str)
    }
}

impl CartItem {
    /// Effective unit price.
    ///
    /// Resolution order: variant sale price, variant price, product sale
    /// price, product price.
    #[must_use]
    pub fn unit_price(&self) -> Decimal {
        self.variant
            .as_ref()
            .and_then(|v| v.sale_price.or(v.price))
            .or(self.product.sale_price)
            .unwrap_or(self.product.price)
    }

    /// Undiscounted unit price, shown struck through when a sale price applies.
    #[must_use]
    pub fn list_price(&self) -> Decimal {
        self.variant
            .as_ref()
            .and_then(|v| v.price)
            .unwrap_or(self.product.price)
    }

    /// Whether the effective price is lower than the list price.
    #[must_use]
    pub fn is_on_sale(&self) -> bool {
        self.unit_price() < self.list_price()
    }

    /// Effective unit price times quantity, saturating at `Decimal::MAX`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price().saturating_mul(Decimal::from(self.quantity))
    }
}

/// Normalize a batch of widget cart lines.
#[must_use]
pub fn normalize_cart(inputs: Vec<CartItemInput>) -> Vec<CartItem> {
    inputs.into_iter().map(normalize_cart_item).collect()
}

/// Map one cart line onto the canonical shape.
///
/// Canonical items only get their quantity and prices bounded; raw items go
/// through the raw mapping, which fills every missing field with a safe
/// default. Prices outside `0..=MAX_UNIT_PRICE` and quantities above
/// [`MAX_QUANTITY`] are treated as malformed.
#[must_use]
pub fn normalize_cart_item(input: CartItemInput) -> CartItem {
    match input {
        CartItemInput::Normalized(mut item) => {
            if !(1..=MAX_QUANTITY).contains(&item.quantity) {
                item.quantity = 1;
            }
            item.product.price = bounded_price(item.product.price).unwrap_or_default();
            item.product.sale_price = item.product.sale_price.and_then(bounded_price);
            if let Some(variant) = item.variant.as_mut() {
                variant.price = variant.price.and_then(bounded_price);
                variant.sale_price = variant.sale_price.and_then(bounded_price);
            }
            item
        }
        CartItemInput::Raw(value) => from_raw(&value),
    }
}

fn from_raw(value: &Value) -> CartItem {
    let empty = Map::new();
    let root = value.as_object().unwrap_or(&empty);

    let id = pick(root, &["id", "cart_item_id", "cartItemId"])
        .and_then(as_id)
        .map(CartItemId::new)
        .unwrap_or_default();
    let quantity = pick(root, &["quantity", "qty"])
        .and_then(as_quantity)
        .unwrap_or(1);

    CartItem {
        id,
        quantity,
        product: raw_product(root),
        variant: raw_variant(root),
    }
}

fn raw_product(root: &Map<String, Value>) -> ProductSnapshot {
    let mut product = ProductSnapshot::placeholder();

    if let Some(nested) = root.get("product").and_then(Value::as_object) {
        if let Some(id) = pick(nested, &["id", "product_id", "productId"]).and_then(as_id) {
            product.id = ProductId::new(id);
        }
        if let Some(name) = pick(nested, &["name", "title", "product_name"]).and_then(as_text) {
            product.name = name;
        }
        product.image = as_images(pick(nested, &["image", "images", "thumbnail"]));
        product.price = pick(nested, &["price"])
            .and_then(as_price)
            .unwrap_or_default();
        product.sale_price = pick(nested, &["sale_price", "salePrice"]).and_then(as_price);
        return product;
    }

    if let Some(id) = pick(root, &["product_id", "productId"]).and_then(as_id) {
        product.id = ProductId::new(id);
    }
    if let Some(name) = pick(root, &["product_name", "productName", "name"]).and_then(as_text) {
        product.name = name;
    }
    product.image = as_images(pick(root, &["product_image", "image", "images"]));
    product.price = pick(root, &["product_price", "price"])
        .and_then(as_price)
        .unwrap_or_default();
    product.sale_price = pick(
        root,
        &["product_sale_price", "sale_price", "salePrice"],
    )
    .and_then(as_price);
    product
}

fn raw_variant(root: &Map<String, Value>) -> Option<VariantOverride> {
    if let Some(nested) = root.get("variant").and_then(Value::as_object) {
        return Some(VariantOverride {
            id: pick(nested, &["id", "variant_id", "variantId"])
                .and_then(as_id)
                .map(VariantId::new)
                .unwrap_or_default(),
            price: pick(nested, &["price"]).and_then(as_price),
            sale_price: pick(nested, &["sale_price", "salePrice"]).and_then(as_price),
        });
    }

    let id = pick(root, &["variant_id", "variantId"]);
    let price = pick(root, &["variant_price", "variantPrice"]);
    let sale_price = pick(root, &["variant_sale_price", "variantSalePrice"]);
    if id.is_none() && price.is_none() && sale_price.is_none() {
        return None;
    }

    Some(VariantOverride {
        id: id.and_then(as_id).map(VariantId::new).unwrap_or_default(),
        price: price.and_then(as_price),
        sale_price: sale_price.and_then(as_price),
    })
}

/// First non-null value among `keys`.
fn pick<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|key| obj.get(*key).filter(|v| !v.is_null()))
}

fn bounded_price(price: Decimal) -> Option<Decimal> {
    (Decimal::ZERO..=MAX_UNIT_PRICE)
        .contains(&price)
        .then_some(price)
}

fn as_price(value: &Value) -> Option<Decimal> {
    as_decimal(value).and_then(bounded_price)
}

fn as_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => n.to_string().parse().ok(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_id(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_quantity(value: &Value) -> Option<u32> {
    let quantity = as_decimal(value)?.trunc().to_u32()?;
    (1..=MAX_QUANTITY).contains(&quantity).then_some(quantity)
}

fn as_text(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Coerce an image field into a list of URLs.
///
/// Accepts a single URL, a list of URLs, an `{url}`/`{src}` object, or a
/// list of such objects.
fn as_images(value: Option<&Value>) -> Vec<String> {
    fn one(value: &Value) -> Option<String> {
        match value {
            Value::String(_) => as_text(value),
            Value::Object(obj) => pick(obj, &["url", "src"]).and_then(as_text),
            _ => None,
        }
    }

    match value {
        Some(Value::Array(items)) => items.iter().filter_map(one).collect(),
        Some(other) => one(other).into_iter().collect(),
        None => Vec::new(),
    }
}
