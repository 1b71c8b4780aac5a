//! Domain models for storefront.
//!
//! Checkout domain types live in `chopho-core`; this module only holds what
//! the storefront keeps in the session.

pub mod session;

pub use session::{CheckoutFlash, keys as session_keys};
