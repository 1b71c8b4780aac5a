//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `BACKEND_API_URL` - Base URL of the platform REST API (e.g., `https://api.example.vn/v1/`)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `BACKEND_TIMEOUT_SECS` - Per-request timeout for backend calls (default: 10)
//! - `AUTH_COOKIE_NAME` - Cookie holding the buyer's bearer token (default: token)
//! - `LOGIN_URL` - Where unauthenticated buyers are sent (default: /login)
//! - `SHIPPING_FEE` - Flat shipping fee in dong (default: 30000)
//! - `VOUCHER_CACHE_TTL_SECS` - How long a voucher validation is reused (default: 60)
//! - `CLIENT_IP_HEADER` - Header set by the reverse proxy with the client IP,
//!   e.g. `cf-connecting-ip` (default: unset, rate limits key on the peer address)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderName;
use rust_decimal::Decimal;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Backend REST API configuration
    pub backend: BackendConfig,
    /// Checkout pricing and caching configuration
    pub checkout: CheckoutConfig,
    /// Header the reverse proxy sets with the client IP; only this header is trusted
    pub client_ip_header: Option<HeaderName>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name (e.g., production, staging)
    pub sentry_environment: Option<String>,
}

/// Backend REST API configuration.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// API base URL, always ending in `/` so endpoints can be joined onto it
    pub api_url: Url,
    /// Timeout applied to every backend request
    pub timeout: Duration,
    /// Name of the cookie carrying the buyer's bearer token
    pub auth_cookie: String,
    /// Login page for buyers without a token
    pub login_url: String,
}

/// Checkout configuration.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Flat shipping fee charged unless a voucher waives it
    pub shipping_fee: Decimal,
    /// How long a successful voucher validation is reused
    pub voucher_cache_ttl: Duration,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(&lookup);

        let host = vars.parse_or("STOREFRONT_HOST", "127.0.0.1")?;
        let port = vars.parse_or("STOREFRONT_PORT", "3000")?;
        let base_url = vars.required("STOREFRONT_BASE_URL")?;

        let backend = BackendConfig {
            api_url: parse_api_url(&vars.required("BACKEND_API_URL")?)?,
            timeout: Duration::from_secs(vars.parse_or("BACKEND_TIMEOUT_SECS", "10")?),
            auth_cookie: vars.or_default("AUTH_COOKIE_NAME", "token"),
            login_url: vars.or_default("LOGIN_URL", "/login"),
        };

        let shipping_fee: Decimal = vars.parse_or("SHIPPING_FEE", "30000")?;
        if shipping_fee.is_sign_negative() {
            return Err(ConfigError::InvalidEnvVar(
                "SHIPPING_FEE".to_string(),
                "must not be negative".to_string(),
            ));
        }
        let checkout = CheckoutConfig {
            shipping_fee,
            voucher_cache_ttl: Duration::from_secs(vars.parse_or("VOUCHER_CACHE_TTL_SECS", "60")?),
        };

        let client_ip_header = vars
            .optional("CLIENT_IP_HEADER")
            .map(|name| {
                HeaderName::from_str(name.trim()).map_err(|e| {
                    ConfigError::InvalidEnvVar("CLIENT_IP_HEADER".to_string(), e.to_string())
                })
            })
            .transpose()?;

        Ok(Self {
            host,
            port,
            base_url,
            backend,
            checkout,
            client_ip_header,
            sentry_dsn: vars.optional("SENTRY_DSN"),
            sentry_environment: vars.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should be marked `Secure`.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Vars<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Vars<'_, F> {
    /// Get an optional variable, treating blank values as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse a variable, falling back to `default` when unset.
    fn parse_or<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.or_default(key, default)
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }
}

/// Parse the backend URL and make sure it ends with `/`.
///
/// `Url::join` replaces the last path segment unless the base ends with a
/// slash, so `https://api/v1` would otherwise resolve `orders` to
/// `https://api/orders`.
fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar("BACKEND_API_URL".to_string(), e.to_string()))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
