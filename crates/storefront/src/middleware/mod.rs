//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers (CSP, no-store, etc.)
//! 5. Session layer (tower-sessions, in-memory store holding the checkout draft)
//! 6. Rate limiting on voucher and submit routes (governor)
//!
//! The buyer's bearer token is not middleware: handlers that call the
//! backend take a [`RequireAuthToken`] extractor.

pub mod auth_token;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth_token::{AuthRejection, RequireAuthToken, is_htmx};
pub use rate_limit::{submit_rate_limiter, voucher_rate_limiter};
pub use request_id::{RequestId, request_id_middleware};
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
