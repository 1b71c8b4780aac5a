//! Wire types for the backend REST API.

use chopho_core::{OrderId, PaymentMethod};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// A buyer's bearer token, read from the auth cookie.
///
/// `Debug` is redacted by `SecretString`.
#[derive(Debug, Clone)]
pub struct BearerToken(SecretString);

impl BearerToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// Raw token for the `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

/// Successful response envelope: `{"data": ...}`.
#[derive(Debug, Deserialize)]
pub(super) struct Envelope<T> {
    pub data: Option<T>,
}

/// Error response body: `{"message": "..."}`, sometimes `{"error": "..."}`.
#[derive(Debug, Deserialize)]
pub(super) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Body of `POST /vouchers/validate`.
#[derive(Debug, Serialize)]
pub(super) struct ValidateVoucherRequest<'a> {
    pub code: &'a str,
    pub subtotal: Decimal,
}

/// Response of `POST /orders`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedOrder {
    pub id: OrderId,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub total: Option<Decimal>,
}

/// Response of `GET /orders/{id}`, used by the confirmation page.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderDetail {
    pub id: OrderId,
    #[serde(default)]
    pub code: Option<String>,
    pub total: Decimal,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub recipient_name: Option<String>,
    #[serde(default)]
    pub full_address: Option<String>,
}
