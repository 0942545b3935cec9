//! Application state shared across all request handlers.

use bizpay_core::{CallbackVerifier, OrderLookup};
use std::sync::Arc;

/// The verifier as the server runs it, with the lookup behind a trait object.
pub type SharedVerifier = CallbackVerifier<Arc<dyn OrderLookup>>;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<SharedVerifier>,
}

impl AppState {
    pub fn new(verifier: SharedVerifier) -> Self {
        Self {
            verifier: Arc::new(verifier),
        }
    }
}
