//! Authoritative order lookup.
//!
//! The verifier never trusts the callback's own claims about an order; it
//! asks the gateway for the stored record through an [`OrderLookup`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bizpay_sdk::client::{ClientError, GatewayClient};
use bizpay_sdk::objects::OrderInfoResponse;
use thiserror::Error;

/// Errors that can occur while fetching the stored order.
#[derive(Debug, Error)]
pub enum LookupError {
    /// Gateway API failure
    #[error("gateway request failed: {0}")]
    Client(#[from] ClientError),

    /// No answer within the configured deadline
    #[error("order lookup timed out after {0:?}")]
    Timeout(Duration),

    /// The gateway reported success without an order record
    #[error("gateway reported success but returned no order information")]
    MissingOrderInfo,

    /// Any other lookup backend failure
    #[error("order lookup unavailable: {0}")]
    Unavailable(String),
}

/// Source of authoritative order records.
///
/// Implemented by [`GatewayClient`] for production use; tests substitute
/// an in-memory fake.
#[async_trait]
pub trait OrderLookup: Send + Sync {
    /// Fetch the gateway's stored record for `order_id_client`.
    async fn fetch_order(&self, order_id_client: &str) -> Result<OrderInfoResponse, LookupError>;
}

#[async_trait]
impl OrderLookup for GatewayClient {
    async fn fetch_order(&self, order_id_client: &str) -> Result<OrderInfoResponse, LookupError> {
        Ok(self.get_order_info(order_id_client).await?)
    }
}

#[async_trait]
impl<T: OrderLookup + ?Sized> OrderLookup for Arc<T> {
    async fn fetch_order(&self, order_id_client: &str) -> Result<OrderInfoResponse, LookupError> {
        (**self).fetch_order(order_id_client).await
    }
}
