//! Session-related types.
//!
//! The checkout draft itself is `chopho_core::CheckoutDraft`, stored under
//! [`keys::CHECKOUT_DRAFT`].

use serde::{Deserialize, Serialize};

/// Messages carried across a redirect for non-HTMX form posts.
///
/// Taken (read and removed) by the next checkout page render.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutFlash {
    /// Inline error for the address widget.
    #[serde(default)]
    pub address_error: Option<String>,
    /// Inline error for the voucher widget.
    #[serde(default)]
    pub voucher_error: Option<String>,
    /// Page-level error, shown above the summary.
    #[serde(default)]
    pub error: Option<String>,
}

impl CheckoutFlash {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.address_error.is_none() && self.voucher_error.is_none() && self.error.is_none()
    }
}

/// Session keys for checkout data.
pub mod keys {
    /// Key for the buyer's checkout draft.
    pub const CHECKOUT_DRAFT: &str = "checkout_draft";

    /// Key for messages shown once after a redirect.
    pub const CHECKOUT_FLASH: &str = "checkout_flash";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flash_is_empty() {
        assert!(CheckoutFlash::default().is_empty());
        let flash = CheckoutFlash {
            voucher_error: Some("Mã giảm giá không hợp lệ".to_string()),
            ..CheckoutFlash::default()
        };
        assert!(!flash.is_empty());
    }
}
