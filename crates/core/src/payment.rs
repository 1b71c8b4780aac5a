//! Payment methods offered at checkout.

use serde::{Deserialize, Serialize};

/// How the buyer pays for the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    #[serde(rename = "cod")]
    CashOnDelivery,
    BankTransfer,
    Vnpay,
}

impl PaymentMethod {
    /// All methods in display order.
    pub const ALL: [Self; 3] = [Self::CashOnDelivery, Self::BankTransfer, Self::Vnpay];

    /// Wire value sent to the backend and used in form fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CashOnDelivery => "cod",
            Self::BankTransfer => "bank_transfer",
            Self::Vnpay => "vnpay",
        }
    }

    /// Buyer-facing label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::CashOnDelivery => "Thanh toán khi nhận hàng",
            Self::BankTransfer => "Chuyển khoản ngân hàng",
            Self::Vnpay => "Ví VNPay",
        }
    }
}
