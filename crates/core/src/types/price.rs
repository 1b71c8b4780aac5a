//! Type-safe price representation using decimal arithmetic.
//!
//! All amounts in the checkout are `rust_decimal::Decimal` values in the
//! currency's standard unit. [`Price`] pairs an amount with its currency for
//! display.

use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (dong).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create a price in Vietnamese dong.
    #[must_use]
    pub const fn vnd(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::VND)
    }
}

/// ISO 4217 currency codes accepted by the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    VND,
}

impl CurrencyCode {
    /// Number of fraction digits shown for this currency.
    #[must_use]
    pub const fn minor_digits(self) -> u32 {
        match self {
            Self::VND => 0,
        }
    }

    /// Symbol written after the amount.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::VND => "₫",
        }
    }
}

impl fmt::Display for Price {
    /// Formats as `250.000 ₫`: whole units grouped by dots.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.currency_code.minor_digits();
        let rounded = self
            .amount
            .round_dp_with_strategy(digits, RoundingStrategy::MidpointAwayFromZero);
        let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };
        let whole = rounded.abs().trunc();

        write!(
            f,
            "{sign}{} {}",
            group_thousands(&whole.to_string(), '.'),
            self.currency_code.symbol()
        )
    }
}

/// Insert `separator` between every group of three digits.
fn group_thousands(digits: &str, separator: char) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(ch);
    }
    out
}
