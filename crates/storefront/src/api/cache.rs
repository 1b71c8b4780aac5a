//! Cache key for voucher validations.

use std::hash::{DefaultHasher, Hash, Hasher};

use rust_decimal::Decimal;

use super::BearerToken;

/// A validation is only reused for the same buyer, code and subtotal.
///
/// The token is stored as a hash so the cache never holds credentials.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct VoucherCacheKey {
    buyer: u64,
    code: String,
    subtotal: Decimal,
}

impl VoucherCacheKey {
    pub fn new(token: &BearerToken, code: &str, subtotal: Decimal) -> Self {
        let mut hasher = DefaultHasher::new();
        token.expose().hash(&mut hasher);
        Self {
            buyer: hasher.finish(),
            code: code.to_string(),
            subtotal: subtotal.normalize(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ignores_decimal_scale() {
        let token = BearerToken::new("abc");
        let a = VoucherCacheKey::new(&token, "SALE15", Decimal::new(2_500_000, 1));
        let b = VoucherCacheKey::new(&token, "SALE15", Decimal::from(250_000));
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_separates_buyers() {
        let a = VoucherCacheKey::new(&BearerToken::new("abc"), "SALE15", Decimal::ONE);
        let b = VoucherCacheKey::new(&BearerToken::new("xyz"), "SALE15", Decimal::ONE);
        assert_ne!(a, b);
    }
}
