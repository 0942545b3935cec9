//! HTTP API.
//!
//! # Endpoints
//!
//! - `GET /callback`, `POST /callback` – verify a gateway callback
//! - `GET /callback/payment-gate`     – verify a payment-gate redirect link

pub mod callback;
