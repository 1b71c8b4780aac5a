//! Vouchers validated by the backend.
//!
//! Eligibility rules belong to the backend. The client keeps what the
//! backend reported for a code (the discount it computed, the free-shipping
//! flag and an optional minimum order value) and re-checks only that
//! reported minimum whenever the cart subtotal changes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Price;

/// Longest code accepted before hitting the backend.
pub const MAX_CODE_LENGTH: usize = 32;

/// Voucher errors detected on the client side.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoucherError {
    #[error("Vui lòng nhập mã giảm giá")]
    EmptyCode,

    #[error("Mã giảm giá không hợp lệ: {0}")]
    InvalidCode(String),

    #[error(
        "Mã {code} chỉ áp dụng cho đơn từ {}, đơn hiện tại {}",
        Price::vnd(*.min_order_value),
        Price::vnd(*.subtotal)
    )]
    Ineligible {
        code: String,
        min_order_value: Decimal,
        subtotal: Decimal,
    },
}

/// A voucher as validated by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voucher {
    pub code: String,
    /// Discount amount computed by the backend for the submitted subtotal.
    pub discount: Decimal,
    #[serde(default)]
    pub free_shipping: bool,
    /// Minimum order subtotal the backend attached to this code.
    #[serde(default)]
    pub min_order_value: Option<Decimal>,
}

impl Voucher {
    /// Canonicalize a user-entered code: trimmed, upper-case, `[A-Z0-9_-]`.
    ///
    /// # Errors
    ///
    /// Returns `EmptyCode` for blank input and `InvalidCode` for codes that
    /// are too long or contain other characters.
    pub fn normalize_code(raw: &str) -> Result<String, VoucherError> {
        let code = raw.trim().to_uppercase();
        if code.is_empty() {
            return Err(VoucherError::EmptyCode);
        }
        let valid_chars = code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid_chars || code.len() > MAX_CODE_LENGTH {
            return Err(VoucherError::InvalidCode(raw.trim().to_string()));
        }
        Ok(code)
    }

    /// Check the backend-reported minimum order value against `subtotal`.
    ///
    /// # Errors
    ///
    /// Returns `Ineligible` when the subtotal is below the minimum.
    pub fn check_eligibility(&self, subtotal: Decimal) -> Result<(), VoucherError> {
        match self.min_order_value {
            Some(min_order_value) if subtotal < min_order_value => Err(VoucherError::Ineligible {
                code: self.code.clone(),
                min_order_value,
                subtotal,
            }),
            _ => Ok(()),
        }
    }

    /// Whether the voucher's condition holds for `subtotal`.
    #[must_use]
    pub fn is_eligible(&self, subtotal: Decimal) -> bool {
        self.check_eligibility(subtotal).is_ok()
    }

    /// Discount applied to `subtotal`: zero when ineligible, never more
    /// than the subtotal itself.
    #[must_use]
    pub fn discount_for(&self, subtotal: Decimal) -> Decimal {
        if !self.is_eligible(subtotal) {
            return Decimal::ZERO;
        }
        self.discount.max(Decimal::ZERO).min(subtotal)
    }

    /// Whether shipping is waived for `subtotal`.
    #[must_use]
    pub fn waives_shipping(&self, subtotal: Decimal) -> bool {
        self.free_shipping && self.is_eligible(subtotal)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sale15() -> Voucher {
        Voucher {
            code: "SALE15".to_string(),
            discount: Decimal::from(37_500),
            free_shipping: false,
            min_order_value: Some(Decimal::from(200_000)),
        }
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(Voucher::normalize_code("  sale15 ").unwrap(), "SALE15");
        assert_eq!(Voucher::normalize_code("free-ship_2").unwrap(), "FREE-SHIP_2");
        assert_eq!(Voucher::normalize_code("   "), Err(VoucherError::EmptyCode));
        assert!(matches!(
            Voucher::normalize_code("sale 15"),
            Err(VoucherError::InvalidCode(_))
        ));
        assert!(matches!(
            Voucher::normalize_code(&"A".repeat(MAX_CODE_LENGTH + 1)),
            Err(VoucherError::InvalidCode(_))
        ));
    }

    #[test]
    fn test_min_order_condition() {
        let voucher = sale15();
        assert!(voucher.check_eligibility(Decimal::from(250_000)).is_ok());
        assert!(voucher.check_eligibility(Decimal::from(200_000)).is_ok());

        let err = voucher.check_eligibility(Decimal::from(150_000)).unwrap_err();
        assert_eq!(
            err,
            VoucherError::Ineligible {
                code: "SALE15".to_string(),
                min_order_value: Decimal::from(200_000),
                subtotal: Decimal::from(150_000),
            }
        );
        assert!(err.to_string().contains("200.000 ₫"));
    }

    #[test]
    fn test_discount_is_clamped_and_zero_when_ineligible() {
        let voucher = sale15();
        assert_eq!(voucher.discount_for(Decimal::from(250_000)), Decimal::from(37_500));
        assert_eq!(voucher.discount_for(Decimal::from(150_000)), Decimal::ZERO);

        let big = Voucher {
            code: "BIG".to_string(),
            discount: Decimal::from(500_000),
            free_shipping: true,
            min_order_value: None,
        };
        assert_eq!(big.discount_for(Decimal::from(120_000)), Decimal::from(120_000));
        assert!(big.waives_shipping(Decimal::from(120_000)));
    }

    #[test]
    fn test_deserializes_backend_payload() {
        let voucher: Voucher = serde_json::from_str(
            r#"{"code":"FREESHIP","discount":0,"free_shipping":true}"#,
        )
        .unwrap();
        assert!(voucher.free_shipping);
        assert_eq!(voucher.min_order_value, None);
    }
}
