//! Backend REST API client.
//!
//! # Architecture
//!
//! - Plain JSON over `reqwest`; every call is authenticated with the buyer's
//!   bearer token taken from the auth cookie
//! - The backend is the source of truth for vouchers, addresses and orders -
//!   nothing is persisted locally
//! - Voucher validations are cached briefly via `moka` so re-applying a code
//!   is idempotent and cheap
//!
//! # Endpoints
//!
//! ```text
//! POST /vouchers/validate   {code, subtotal}   -> {data: Voucher}
//! GET  /addresses                              -> {data: [SavedAddress]}
//! POST /addresses           ManualAddress      -> {data: SavedAddress}
//! POST /orders              OrderRequest       -> {data: CreatedOrder}
//! GET  /orders/{id}                            -> {data: OrderDetail}
//! GET  /health
//! ```
//!
//! Errors come back as non-2xx responses with a `{"message": "..."}` body.

mod cache;
pub mod types;

pub use types::{BearerToken, CreatedOrder, OrderDetail};

use std::sync::Arc;

use chopho_core::{ManualAddress, OrderId, OrderRequest, SavedAddress, Voucher};
use moka::future::Cache;
use reqwest::{RequestBuilder, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::config::{BackendConfig, CheckoutConfig};
use cache::VoucherCacheKey;
use types::{Envelope, ErrorBody, ValidateVoucherRequest};

/// Longest slice of a response body written to logs.
const LOG_BODY_LIMIT: usize = 500;

/// Errors that can occur when calling the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Endpoint URL could not be built.
    #[error("Invalid endpoint: {0}")]
    Url(#[from] url::ParseError),

    /// The bearer token was missing, expired or revoked.
    #[error("Unauthorized")]
    Unauthorized,

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backend refused the request (validation, ineligible voucher, out of stock...).
    #[error("Rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// A 2xx response without a `data` field.
    #[error("Empty response from backend")]
    EmptyResponse,
}

impl ApiError {
    /// Message that is safe to show to the buyer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { message, .. } => message.clone(),
            Self::Unauthorized => "Phiên đăng nhập đã hết hạn, vui lòng đăng nhập lại".to_string(),
            Self::RateLimited(_) => "Bạn thao tác quá nhanh, vui lòng thử lại sau".to_string(),
            Self::NotFound(_) => "Không tìm thấy dữ liệu".to_string(),
            Self::Http(_) | Self::Parse(_) | Self::Url(_) | Self::EmptyResponse => {
                "Không thể kết nối máy chủ, vui lòng thử lại".to_string()
            }
        }
    }

    /// Whether this is a problem on our side or the backend's rather than
    /// a refusal the buyer can act on.
    #[must_use]
    pub const fn is_server_fault(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Parse(_) | Self::Url(_) | Self::EmptyResponse
        )
    }
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the platform's backend REST API.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    vouchers: Cache<VoucherCacheKey, Voucher>,
}

impl ApiClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(backend: &BackendConfig, checkout: &CheckoutConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(backend.timeout)
            .user_agent(concat!("chopho-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let vouchers = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(checkout.voucher_cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: backend.api_url.clone(),
                vouchers,
            }),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path)?)
    }

    /// Send a request and unwrap the `data` envelope.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        let url = response.url().path().to_string();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(status_error(status, &url, &body));
        }

        parse_envelope(&body).inspect_err(|e| {
            tracing::error!(
                error = %e,
                body = %truncate(&body),
                "Failed to parse backend response"
            );
        })
    }

    // =========================================================================
    // Vouchers
    // =========================================================================

    /// Validate a voucher code for the given subtotal.
    ///
    /// Successful validations are cached per buyer, code and subtotal.
    ///
    /// # Errors
    ///
    /// Returns `Rejected` with the backend's message when the code is
    /// unknown, expired or not applicable, or a transport error.
    #[instrument(skip(self, token), fields(code = %code, subtotal = %subtotal))]
    pub async fn validate_voucher(
        &self,
        token: &BearerToken,
        code: &str,
        subtotal: Decimal,
    ) -> Result<Voucher, ApiError> {
        let key = VoucherCacheKey::new(token, code, subtotal);
        if let Some(voucher) = self.inner.vouchers.get(&key).await {
            debug!("Cache hit for voucher");
            return Ok(voucher);
        }

        let request = self
            .inner
            .client
            .post(self.endpoint("vouchers/validate")?)
            .bearer_auth(token.expose())
            .json(&ValidateVoucherRequest { code, subtotal });
        let voucher: Voucher = self.send(request).await?;

        self.inner.vouchers.insert(key, voucher.clone()).await;
        Ok(voucher)
    }

    // =========================================================================
    // Addresses
    // =========================================================================

    /// List the buyer's saved addresses.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn list_addresses(&self, token: &BearerToken) -> Result<Vec<SavedAddress>, ApiError> {
        let request = self
            .inner
            .client
            .get(self.endpoint("addresses")?)
            .bearer_auth(token.expose());
        self.send(request).await
    }

    /// Save a manually entered address to the buyer's address book.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the address or the request fails.
    #[instrument(skip(self, token, address))]
    pub async fn create_address(
        &self,
        token: &BearerToken,
        address: &ManualAddress,
    ) -> Result<SavedAddress, ApiError> {
        let request = self
            .inner
            .client
            .post(self.endpoint("addresses")?)
            .bearer_auth(token.expose())
            .json(address);
        self.send(request).await
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Create an order from a checkout submission.
    ///
    /// # Errors
    ///
    /// Returns `Rejected` with the backend's message when the order is
    /// refused, or a transport error.
    #[instrument(skip(self, token, order), fields(lines = order.items.len(), total = %order.total))]
    pub async fn create_order(
        &self,
        token: &BearerToken,
        order: &OrderRequest,
    ) -> Result<CreatedOrder, ApiError> {
        let request = self
            .inner
            .client
            .post(self.endpoint("orders")?)
            .bearer_auth(token.expose())
            .json(order);
        self.send(request).await
    }

    /// Fetch an order for the confirmation page.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the order does not exist or belongs to someone else.
    #[instrument(skip(self, token), fields(order_id = %id))]
    pub async fn get_order(&self, token: &BearerToken, id: OrderId) -> Result<OrderDetail, ApiError> {
        let request = self
            .inner
            .client
            .get(self.endpoint(&format!("orders/{id}"))?)
            .bearer_auth(token.expose());
        self.send(request).await
    }

    // =========================================================================
    // Health
    // =========================================================================

    /// Check that the backend answers its health endpoint.
    pub async fn is_healthy(&self) -> bool {
        let Ok(url) = self.endpoint("health") else {
            return false;
        };
        match self.inner.client.get(url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!(error = %e, "Backend health check failed");
                false
            }
        }
    }
}

// =============================================================================
// Response Helpers
// =============================================================================

fn parse_envelope<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    let envelope: Envelope<T> = serde_json::from_str(body)?;
    envelope.data.ok_or(ApiError::EmptyResponse)
}

/// Pull the human-readable message out of an error body.
fn error_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed
        .message
        .or(parsed.error)
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
}

fn status_error(status: StatusCode, path: &str, body: &str) -> ApiError {
    match status {
        StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
        StatusCode::NOT_FOUND => ApiError::NotFound(path.to_string()),
        _ => {
            if status.is_server_error() {
                tracing::error!(
                    status = %status,
                    body = %truncate(body),
                    "Backend returned server error"
                );
            }
            ApiError::Rejected {
                status: status.as_u16(),
                message: error_message(body).unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("Request failed")
                        .to_string()
                }),
            }
        }
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(LOG_BODY_LIMIT).collect()
}
