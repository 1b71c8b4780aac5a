//! Rate limiting middleware using governor and `tower_governor`.
//!
//! - `voucher_rate_limiter`: voucher lookups (~10/min per IP) to slow down
//!   code guessing
//! - `submit_rate_limiter`: order submissions (~6/min per IP)
//!
//! Clients are keyed by the peer address unless `CLIENT_IP_HEADER` names the
//! header the reverse proxy sets. No other header is trusted, so a client
//! cannot pick its own key.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{HeaderName, Request};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Key extractor that reads the client IP from the configured proxy header,
/// or from the peer address when none is configured.
#[derive(Clone, Debug)]
pub struct ClientIpKeyExtractor {
    trusted_header: Option<HeaderName>,
}

impl ClientIpKeyExtractor {
    #[must_use]
    pub const fn new(trusted_header: Option<HeaderName>) -> Self {
        Self { trusted_header }
    }
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        if let Some(name) = &self.trusted_header {
            // Proxies append to a chain; the last entry is the one ours added.
            return req
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.rsplit(',').next())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
                .ok_or(GovernorError::UnableToExtractKey);
        }

        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

fn limiter(
    trusted_header: Option<HeaderName>,
    replenish_every_secs: u64,
    burst: u32,
) -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor::new(trusted_header))
        .per_second(replenish_every_secs)
        .burst_size(burst)
        .finish()
        .expect("rate limiter config with positive period and burst is valid");
    GovernorLayer::new(Arc::new(config))
}

/// Voucher lookups: 1 token every 6 seconds, burst of 5.
#[must_use]
pub fn voucher_rate_limiter(trusted_header: Option<HeaderName>) -> RateLimiterLayer {
    limiter(trusted_header, 6, 5)
}

/// Order submissions: 1 token every 10 seconds, burst of 3.
#[must_use]
pub fn submit_rate_limiter(trusted_header: Option<HeaderName>) -> RateLimiterLayer {
    limiter(trusted_header, 10, 3)
}
