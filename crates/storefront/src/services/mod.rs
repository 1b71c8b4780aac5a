//! Business logic services for storefront.
//!
//! # Services
//!
//! - `submissions` - Process-wide guard against duplicate order submissions

pub mod submissions;

pub use submissions::{SubmissionRegistry, SubmissionTicket};
