//! Callback verification for the BizPay payment gateway.
//!
//! [`verifier::CallbackVerifier`] decides whether an inbound callback can be
//! trusted, consulting the gateway's stored order through an
//! [`lookup::OrderLookup`].

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod consistency;
pub mod lookup;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod verifier;

pub use lookup::{LookupError, OrderLookup};
pub use verifier::{CallbackVerifier, VerificationOutcome, VerifyError};
