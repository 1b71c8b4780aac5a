//! Integration tests for the Chợ Phố storefront.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the storefront against a backend with a seeded buyer
//! cargo run -p chopho-storefront
//!
//! # Run integration tests
//! CHOPHO_TEST_TOKEN=... cargo test -p chopho-integration-tests -- --ignored
//! ```
//!
//! # Environment
//!
//! - `STOREFRONT_URL` - Running storefront (default: `http://localhost:3000`)
//! - `CHOPHO_TEST_TOKEN` - Bearer token of a test buyer
//! - `AUTH_COOKIE_NAME` - Cookie the storefront reads the token from (default: `token`)
//! - `CHOPHO_TEST_ADDRESS_ID` - A saved address of the test buyer (for submit tests)

use reqwest::Client;
use reqwest::header::{COOKIE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

/// Shared setup for tests that talk to a running storefront.
pub struct TestContext {
    /// Client with a cookie store, so the session cookie is kept.
    pub client: Client,
    pub storefront_url: String,
}

impl TestContext {
    /// Build a context from the environment.
    ///
    /// # Panics
    ///
    /// Panics if `CHOPHO_TEST_TOKEN` is not set or the client cannot be built.
    #[must_use]
    pub fn from_env() -> Self {
        let token = SecretString::from(
            std::env::var("CHOPHO_TEST_TOKEN").expect("CHOPHO_TEST_TOKEN must be set"),
        );
        let cookie_name = std::env::var("AUTH_COOKIE_NAME").unwrap_or_else(|_| "token".to_string());

        let mut headers = HeaderMap::new();
        let cookie = format!("{cookie_name}={}", token.expose_secret());
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&cookie).expect("token is a valid header value"),
        );

        Self {
            client: Client::builder()
                .cookie_store(true)
                .default_headers(headers)
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .expect("Failed to create HTTP client"),
            storefront_url: storefront_url(),
        }
    }

    /// Absolute URL for a storefront path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.storefront_url)
    }
}

/// Base URL of the storefront under test.
#[must_use]
pub fn storefront_url() -> String {
    std::env::var("STOREFRONT_URL")
        .unwrap_or_else(|_| "http://localhost:3000".to_string())
        .trim_end_matches('/')
        .to_string()
}
