//! The checkout draft and its submission state machine.
//!
//! A [`CheckoutDraft`] aggregates what the checkout widgets report (cart
//! lines, address, voucher, payment method) and moves through
//!
//! ```text
//! Idle -> Filling -> Submitting -> Succeeded
//!            ^            |
//!            +-- Failed <-+
//! ```
//!
//! `Failed` keeps the backend's message in [`CheckoutDraft::last_error`] and
//! goes back to `Filling` on the next edit. A draft in `Submitting` refuses
//! a second [`CheckoutDraft::begin_submit`], which is what de-duplicates
//! double-clicked submit buttons.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::address::{AddressChoice, ManualAddress};
use crate::cart::{CartItem, CartItemInput, normalize_cart};
use crate::payment::PaymentMethod;
use crate::types::{AddressId, CartItemId, OrderId, ProductId, VariantId};
use crate::voucher::{Voucher, VoucherError};

/// Errors from driving a checkout draft.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error("Đơn hàng đang được gửi, vui lòng đợi")]
    AlreadySubmitting,

    #[error("Đơn hàng đã được đặt")]
    Closed,

    #[error("Giỏ hàng trống")]
    EmptyCart,

    #[error("Vui lòng chọn địa chỉ giao hàng")]
    MissingAddress,

    #[error("{0}")]
    Voucher(#[from] VoucherError),

    #[error("Đơn hàng không ở trạng thái đang gửi")]
    NotSubmitting,
}

/// Where a draft is in the checkout flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CheckoutPhase {
    #[default]
    Idle,
    Filling,
    Submitting,
    Succeeded {
        order_id: OrderId,
    },
    Failed,
}

/// Totals derived from a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderSummary {
    pub item_count: u32,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
    pub free_shipping: bool,
    pub voucher_code: Option<String>,
    /// False when an applied voucher's condition no longer holds.
    pub voucher_eligible: bool,
}

/// One line of the order-creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLine {
    pub cart_item_id: CartItemId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
    pub unit_price: Decimal,
}

/// Address part of the order-creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OrderAddress {
    Stored { address_id: AddressId },
    Manual(ManualAddress),
}

/// Body of the backend's order-creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRequest {
    pub items: Vec<OrderLine>,
    pub address: OrderAddress,
    pub voucher_code: Option<String>,
    pub payment_method: PaymentMethod,
    pub shipping_fee: Decimal,
    pub total: Decimal,
    pub note: Option<String>,
}

/// The checkout page's composed state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutDraft {
    pub id: Uuid,
    pub items: Vec<CartItem>,
    pub address: AddressChoice,
    pub voucher: Option<Voucher>,
    pub payment_method: PaymentMethod,
    pub phase: CheckoutPhase,
    pub last_error: Option<String>,
}

impl Default for CheckoutDraft {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckoutDraft {
    /// Start an empty draft.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            items: Vec::new(),
            address: AddressChoice::None,
            voucher: None,
            payment_method: PaymentMethod::default(),
            phase: CheckoutPhase::Idle,
            last_error: None,
        }
    }

    /// Record an edit: `Idle` and `Failed` move to `Filling`.
    fn touch(&mut self) -> Result<(), CheckoutError> {
        match self.phase {
            CheckoutPhase::Succeeded { .. } => Err(CheckoutError::Closed),
            CheckoutPhase::Idle | CheckoutPhase::Failed => {
                self.phase = CheckoutPhase::Filling;
                Ok(())
            }
            CheckoutPhase::Filling | CheckoutPhase::Submitting => Ok(()),
        }
    }

    /// Replace the cart with normalized widget lines.
    ///
    /// # Errors
    ///
    /// Returns `Closed` once the order has been placed.
    pub fn replace_items(&mut self, inputs: Vec<CartItemInput>) -> Result<(), CheckoutError> {
        self.touch()?;
        self.items = normalize_cart(inputs);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `Closed` once the order has been placed.
    pub fn select_stored_address(&mut self, id: AddressId) -> Result<(), CheckoutError> {
        self.touch()?;
        self.address.select_stored(id);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `Closed` once the order has been placed.
    pub fn set_manual_address(
        &mut self,
        manual: Option<ManualAddress>,
    ) -> Result<(), CheckoutError> {
        self.touch()?;
        self.address.set_manual(manual);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `Closed` once the order has been placed.
    pub fn clear_address(&mut self) -> Result<(), CheckoutError> {
        self.touch()?;
        self.address.clear();
        Ok(())
    }

    /// Store a backend-validated voucher, replacing any previous one.
    ///
    /// On error the current voucher is left as it was.
    ///
    /// # Errors
    ///
    /// Returns `Closed` once the order has been placed, or a voucher
    /// `Ineligible` error when the reported minimum order value is not met
    /// by the current subtotal.
    pub fn apply_voucher(&mut self, voucher: Voucher) -> Result<(), CheckoutError> {
        self.touch()?;
        voucher.check_eligibility(self.subtotal())?;
        self.voucher = Some(voucher);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `Closed` once the order has been placed.
    pub fn remove_voucher(&mut self) -> Result<(), CheckoutError> {
        self.touch()?;
        self.voucher = None;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `Closed` once the order has been placed.
    pub fn set_payment_method(&mut self, method: PaymentMethod) -> Result<(), CheckoutError> {
        self.touch()?;
        self.payment_method = method;
        Ok(())
    }

    /// Sum of line totals at effective unit prices, saturating at `Decimal::MAX`.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items
            .iter()
            .map(CartItem::line_total)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    /// Derive the totals shown in the order summary.
    ///
    /// `base_shipping_fee` is charged unless the cart is empty or an eligible
    /// voucher waives shipping.
    #[must_use]
    pub fn summary(&self, base_shipping_fee: Decimal) -> OrderSummary {
        let subtotal = self.subtotal();
        let voucher = self.voucher.as_ref();

        let discount = voucher.map_or(Decimal::ZERO, |v| v.discount_for(subtotal));
        let free_shipping = voucher.is_some_and(|v| v.waives_shipping(subtotal));
        let shipping_fee = if self.items.is_empty() || free_shipping {
            Decimal::ZERO
        } else {
            base_shipping_fee.max(Decimal::ZERO)
        };

        OrderSummary {
            item_count: self
                .items
                .iter()
                .fold(0, |count: u32, item| count.saturating_add(item.quantity)),
            subtotal,
            discount,
            shipping_fee,
            total: subtotal
                .saturating_sub(discount)
                .saturating_add(shipping_fee)
                .max(Decimal::ZERO),
            free_shipping,
            voucher_code: voucher.map(|v| v.code.clone()),
            voucher_eligible: voucher.is_none_or(|v| v.is_eligible(subtotal)),
        }
    }

    /// Whether a submission is in flight.
    #[must_use]
    pub const fn is_submitting(&self) -> bool {
        matches!(self.phase, CheckoutPhase::Submitting)
    }

    /// Move to `Submitting` and build the order request from current state.
    ///
    /// # Errors
    ///
    /// - `AlreadySubmitting` while a previous submission is in flight
    /// - `Closed` once the order has been placed
    /// - `EmptyCart`, `MissingAddress`, or a voucher error when the draft is
    ///   not ready; the phase is left unchanged in that case
    pub fn begin_submit(
        &mut self,
        base_shipping_fee: Decimal,
        note: Option<String>,
    ) -> Result<OrderRequest, CheckoutError> {
        match self.phase {
            CheckoutPhase::Submitting => return Err(CheckoutError::AlreadySubmitting),
            CheckoutPhase::Succeeded { .. } => return Err(CheckoutError::Closed),
            CheckoutPhase::Idle | CheckoutPhase::Filling | CheckoutPhase::Failed => {}
        }

        if self.items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let address = match &self.address {
            AddressChoice::None => return Err(CheckoutError::MissingAddress),
            AddressChoice::Stored { id } => OrderAddress::Stored { address_id: *id },
            AddressChoice::Manual(manual) => OrderAddress::Manual(manual.clone()),
        };
        if let Some(voucher) = &self.voucher {
            voucher.check_eligibility(self.subtotal())?;
        }

        let summary = self.summary(base_shipping_fee);
        let request = OrderRequest {
            items: self
                .items
                .iter()
                .map(|item| OrderLine {
                    cart_item_id: item.id,
                    product_id: item.product.id,
                    variant_id: item.variant.as_ref().map(|v| v.id),
                    quantity: item.quantity,
                    unit_price: item.unit_price(),
                })
                .collect(),
            address,
            voucher_code: summary.voucher_code,
            payment_method: self.payment_method,
            shipping_fee: summary.shipping_fee,
            total: summary.total,
            note: note
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
        };

        self.phase = CheckoutPhase::Submitting;
        self.last_error = None;
        Ok(request)
    }

    /// Record a successful submission.
    ///
    /// # Errors
    ///
    /// Returns `NotSubmitting` unless a submission is in flight.
    pub fn complete(&mut self, order_id: OrderId) -> Result<(), CheckoutError> {
        if !self.is_submitting() {
            return Err(CheckoutError::NotSubmitting);
        }
        self.phase = CheckoutPhase::Succeeded { order_id };
        self.last_error = None;
        Ok(())
    }

    /// Record a failed submission, keeping `message` for display.
    ///
    /// # Errors
    ///
    /// Returns `NotSubmitting` unless a submission is in flight.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), CheckoutError> {
        if !self.is_submitting() {
            return Err(CheckoutError::NotSubmitting);
        }
        self.phase = CheckoutPhase::Failed;
        self.last_error = Some(message.into());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    const SHIPPING: Decimal = Decimal::from_parts(30_000, 0, 0, false, 0);

    fn raw(value: serde_json::Value) -> CartItemInput {
        serde_json::from_value(value).unwrap()
    }

    fn draft_with_subtotal(amount: i64) -> CheckoutDraft {
        let mut draft = CheckoutDraft::new();
        draft
            .replace_items(vec![raw(json!({
                "id": 1,
                "quantity": 1,
                "product": { "id": 10, "name": "Áo", "price": amount },
            }))])
            .unwrap();
        draft
    }

    fn sale15() -> Voucher {
        Voucher {
            code: "SALE15".to_string(),
            discount: Decimal::from(37_500),
            free_shipping: false,
            min_order_value: Some(Decimal::from(200_000)),
        }
    }

    fn manual() -> ManualAddress {
        ManualAddress::new("Lê C", "0987654321", "5 Nguyễn Huệ, TP.HCM").unwrap()
    }

    #[test]
    fn test_oversized_widget_values_do_not_overflow_summary() {
        let mut draft = CheckoutDraft::new();
        draft
            .replace_items(vec![
                raw(json!({
                    "quantity": 2,
                    "product": { "price": "79228162514264337593543950335" },
                })),
                raw(json!({
                    "quantity": "4294967295",
                    "product": { "price": 100_000 },
                })),
            ])
            .unwrap();

        assert_eq!(draft.items[0].product.price, Decimal::ZERO);
        assert_eq!(draft.items[1].quantity, 1);

        let summary = draft.summary(SHIPPING);
        assert_eq!(summary.subtotal, Decimal::from(100_000));
        assert_eq!(summary.total, Decimal::from(130_000));
    }

    #[test]
    fn test_lines_at_the_limits_stay_exact() {
        let line = |id: i32| {
            raw(json!({
                "id": id,
                "quantity": crate::cart::MAX_QUANTITY,
                "product": {
                    "id": id,
                    "name": "Máy xúc",
                    "image": [],
                    "price": crate::cart::MAX_UNIT_PRICE.to_string(),
                },
            }))
        };
        let mut draft = CheckoutDraft::new();
        draft.replace_items((1..=3).map(line).collect()).unwrap();

        let summary = draft.summary(SHIPPING);
        assert_eq!(summary.item_count, 30_000);
        assert_eq!(
            summary.subtotal,
            crate::cart::MAX_UNIT_PRICE * Decimal::from(30_000)
        );
        assert!(summary.total > summary.subtotal);
    }

    #[test]
    fn test_new_draft_is_idle_and_edits_move_to_filling() {
        let mut draft = CheckoutDraft::new();
        assert_eq!(draft.phase, CheckoutPhase::Idle);
        draft.set_payment_method(PaymentMethod::Vnpay).unwrap();
        assert_eq!(draft.phase, CheckoutPhase::Filling);
        assert_eq!(draft.payment_method, PaymentMethod::Vnpay);
    }

    #[test]
    fn test_summary_totals() {
        let mut draft = CheckoutDraft::new();
        draft
            .replace_items(vec![
                raw(json!({ "quantity": "2", "product": { "price": 100_000 } })),
                raw(json!({
                    "quantity": 1,
                    "product": { "price": 80_000, "sale_price": 60_000 },
                })),
            ])
            .unwrap();

        let summary = draft.summary(SHIPPING);
        assert_eq!(summary.item_count, 3);
        assert_eq!(summary.subtotal, Decimal::from(260_000));
        assert_eq!(summary.discount, Decimal::ZERO);
        assert_eq!(summary.shipping_fee, Decimal::from(30_000));
        assert_eq!(summary.total, Decimal::from(290_000));
        assert!(summary.voucher_eligible);
    }

    #[test]
    fn test_empty_cart_has_no_shipping() {
        let summary = CheckoutDraft::new().summary(SHIPPING);
        assert_eq!(summary.total, Decimal::ZERO);
        assert_eq!(summary.shipping_fee, Decimal::ZERO);
    }

    #[test]
    fn test_voucher_applies_on_eligible_cart() {
        let mut draft = draft_with_subtotal(250_000);
        draft.apply_voucher(sale15()).unwrap();

        let summary = draft.summary(SHIPPING);
        assert_eq!(summary.discount, Decimal::from(37_500));
        assert_eq!(summary.total, Decimal::from(242_500));
        assert_eq!(summary.voucher_code.as_deref(), Some("SALE15"));
    }

    #[test]
    fn test_voucher_rejected_on_small_cart() {
        let mut draft = draft_with_subtotal(150_000);
        let err = draft.apply_voucher(sale15()).unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Voucher(VoucherError::Ineligible { .. })
        ));
        assert!(draft.voucher.is_none());
    }

    #[test]
    fn test_voucher_application_is_idempotent() {
        let mut draft = draft_with_subtotal(250_000);
        draft.apply_voucher(sale15()).unwrap();
        let first = draft.summary(SHIPPING);
        draft.apply_voucher(sale15()).unwrap();
        let second = draft.summary(SHIPPING);
        assert_eq!(first, second);
    }

    #[test]
    fn test_failed_voucher_keeps_previous() {
        let mut draft = draft_with_subtotal(150_000);
        let free_ship = Voucher {
            code: "FREESHIP".to_string(),
            discount: Decimal::ZERO,
            free_shipping: true,
            min_order_value: None,
        };
        draft.apply_voucher(free_ship).unwrap();
        assert!(draft.apply_voucher(sale15()).is_err());
        assert_eq!(draft.voucher.as_ref().unwrap().code, "FREESHIP");
        assert_eq!(draft.summary(SHIPPING).shipping_fee, Decimal::ZERO);
    }

    #[test]
    fn test_voucher_loses_effect_when_cart_shrinks() {
        let mut draft = draft_with_subtotal(250_000);
        draft.apply_voucher(sale15()).unwrap();
        draft
            .replace_items(vec![raw(json!({ "product": { "price": 100_000 } }))])
            .unwrap();

        let summary = draft.summary(SHIPPING);
        assert!(!summary.voucher_eligible);
        assert_eq!(summary.discount, Decimal::ZERO);

        draft.select_stored_address(AddressId::new(1)).unwrap();
        assert!(matches!(
            draft.begin_submit(SHIPPING, None),
            Err(CheckoutError::Voucher(VoucherError::Ineligible { .. }))
        ));
        assert_eq!(draft.phase, CheckoutPhase::Filling);
    }

    #[test]
    fn test_begin_submit_requires_items_and_address() {
        let mut draft = CheckoutDraft::new();
        assert_eq!(
            draft.begin_submit(SHIPPING, None),
            Err(CheckoutError::EmptyCart)
        );

        let mut draft = draft_with_subtotal(100_000);
        assert_eq!(
            draft.begin_submit(SHIPPING, None),
            Err(CheckoutError::MissingAddress)
        );
    }

    #[test]
    fn test_submit_blocks_repeat_submissions() {
        let mut draft = draft_with_subtotal(100_000);
        draft.select_stored_address(AddressId::new(3)).unwrap();

        let request = draft.begin_submit(SHIPPING, Some("  giao giờ hành chính ".into()));
        let request = request.unwrap();
        assert_eq!(draft.phase, CheckoutPhase::Submitting);
        assert_eq!(request.total, Decimal::from(130_000));
        assert_eq!(request.note.as_deref(), Some("giao giờ hành chính"));
        assert_eq!(
            request.address,
            OrderAddress::Stored {
                address_id: AddressId::new(3)
            }
        );

        assert_eq!(
            draft.begin_submit(SHIPPING, None),
            Err(CheckoutError::AlreadySubmitting)
        );
    }

    #[test]
    fn test_failure_keeps_error_and_allows_retry() {
        let mut draft = draft_with_subtotal(100_000);
        draft.set_manual_address(Some(manual())).unwrap();
        draft.begin_submit(SHIPPING, None).unwrap();

        draft.fail("Sản phẩm đã hết hàng").unwrap();
        assert_eq!(draft.phase, CheckoutPhase::Failed);
        assert_eq!(draft.last_error.as_deref(), Some("Sản phẩm đã hết hàng"));

        draft.set_payment_method(PaymentMethod::BankTransfer).unwrap();
        assert_eq!(draft.phase, CheckoutPhase::Filling);
        assert!(draft.last_error.is_some());

        let request = draft.begin_submit(SHIPPING, None).unwrap();
        assert_eq!(request.payment_method, PaymentMethod::BankTransfer);
        assert!(draft.last_error.is_none());
    }

    #[test]
    fn test_success_closes_draft() {
        let mut draft = draft_with_subtotal(100_000);
        draft.select_stored_address(AddressId::new(3)).unwrap();
        draft.begin_submit(SHIPPING, None).unwrap();
        draft.complete(OrderId::new(77)).unwrap();

        assert_eq!(
            draft.phase,
            CheckoutPhase::Succeeded {
                order_id: OrderId::new(77)
            }
        );
        assert_eq!(draft.remove_voucher(), Err(CheckoutError::Closed));
        assert_eq!(
            draft.begin_submit(SHIPPING, None),
            Err(CheckoutError::Closed)
        );
    }

    #[test]
    fn test_outcome_requires_submitting() {
        let mut draft = CheckoutDraft::new();
        assert_eq!(draft.fail("x"), Err(CheckoutError::NotSubmitting));
        assert_eq!(
            draft.complete(OrderId::new(1)),
            Err(CheckoutError::NotSubmitting)
        );
    }

    #[test]
    fn test_order_request_serialization() {
        let mut draft = draft_with_subtotal(100_000);
        draft.set_manual_address(Some(manual())).unwrap();
        let request = draft.begin_submit(SHIPPING, None).unwrap();

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["payment_method"], "cod");
        assert_eq!(json["address"]["recipient_name"], "Lê C");
        assert_eq!(json["items"][0]["product_id"], 10);
        assert_eq!(json["items"][0]["variant_id"], serde_json::Value::Null);
        assert_eq!(json["voucher_code"], serde_json::Value::Null);
    }

    #[test]
    fn test_draft_round_trips_through_session_json() {
        let mut draft = draft_with_subtotal(100_000);
        draft.apply_voucher(sale15()).ok();
        draft.set_manual_address(Some(manual())).unwrap();

        let json = serde_json::to_string(&draft).unwrap();
        let restored: CheckoutDraft = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, draft);
    }
}
