//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness check
//! GET  /health/ready                - Readiness check (backend reachable)
//!
//! # Checkout (requires the auth cookie; HTMX fragments or redirects)
//! GET  /checkout                    - Checkout page
//! POST /checkout/cart               - Replace cart lines (JSON)
//! POST /checkout/address/select     - Use a saved address
//! POST /checkout/address/manual     - Use a manually entered address
//! POST /checkout/address/save       - Save manual address to the address book
//! POST /checkout/address/clear      - Clear the address
//! POST /checkout/voucher            - Apply a voucher code (rate limited)
//! POST /checkout/voucher/remove     - Remove the voucher
//! POST /checkout/payment            - Choose the payment method
//! POST /checkout/submit             - Place the order (rate limited)
//!
//! # Orders
//! GET  /orders/{id}/confirmation    - Order confirmation page
//! ```

pub mod checkout;
pub mod orders;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::config::StorefrontConfig;
use crate::middleware::{submit_rate_limiter, voucher_rate_limiter};
use crate::state::AppState;

/// Create the checkout routes router.
pub fn checkout_routes(config: &StorefrontConfig) -> Router<AppState> {
    let client_ip_header = &config.client_ip_header;
    Router::new()
        .route("/", get(checkout::show))
        .route("/cart", post(checkout::cart::replace))
        .route("/address/select", post(checkout::address::select))
        .route("/address/manual", post(checkout::address::manual))
        .route("/address/save", post(checkout::address::save))
        .route("/address/clear", post(checkout::address::clear))
        .route(
            "/voucher",
            post(checkout::voucher::apply)
                .layer(voucher_rate_limiter(client_ip_header.clone())),
        )
        .route("/voucher/remove", post(checkout::voucher::remove))
        .route("/payment", post(checkout::payment::select))
        .route(
            "/submit",
            post(checkout::submit::submit).layer(submit_rate_limiter(client_ip_header.clone())),
        )
}

/// Create all routes for the storefront.
pub fn routes(config: &StorefrontConfig) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/checkout", checkout_routes(config))
        .route("/orders/{id}/confirmation", get(orders::confirmation))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the backend is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.api().is_healthy().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
