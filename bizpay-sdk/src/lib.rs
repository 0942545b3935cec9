//! Wire types, canonicalization and signing for the BizPay payment gateway.
//!
//! - [`signature`]: signature domains, canonical strings and the [`Signer`].
//! - [`objects`]: callback payloads, order records and outbound requests.
//! - [`config`]: validated configuration values.
//! - `client` (feature `client`): HTTP client for the gateway's order API.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

#[cfg(feature = "client")]
pub mod client;
pub mod config;
pub mod objects;
pub mod signature;

pub use signature::Signer;
