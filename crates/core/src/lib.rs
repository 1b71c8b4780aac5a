//! Chợ Phố Core - checkout domain types.
//!
//! This crate holds the data model behind the buyer checkout:
//! - cart line items and the normalizer that turns loosely-shaped widget
//!   payloads into canonical [`CartItem`]s
//! - vouchers, addresses and payment methods
//! - the [`CheckoutDraft`] aggregate with its submission state machine
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no sessions. The storefront binary owns all of that and drives
//! the draft through its methods.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs and money formatting
//! - [`cart`] - Cart items, effective prices, normalization
//! - [`voucher`] - Validated vouchers and their order conditions
//! - [`address`] - Stored vs. manually entered shipping addresses
//! - [`payment`] - Payment methods
//! - [`checkout`] - Draft aggregate, order summary, submit payload

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod address;
pub mod cart;
pub mod checkout;
pub mod payment;
pub mod types;
pub mod voucher;

pub use address::{AddressChoice, AddressError, ManualAddress, SavedAddress};
pub use cart::{CartItem, CartItemInput, ProductSnapshot, VariantOverride, normalize_cart};
pub use checkout::{
    CheckoutDraft, CheckoutError, CheckoutPhase, OrderAddress, OrderLine, OrderRequest,
    OrderSummary,
};
pub use payment::PaymentMethod;
pub use types::*;
pub use voucher::{Voucher, VoucherError};
