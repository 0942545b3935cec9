//! Configuration types for the BizPay integration.
//!
//! These are validated values; loading them from files or the environment is
//! left to the embedding application.

mod gateway;

pub use gateway::{Environment, GatewayConfig};

/// Errors raised while building configuration values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("project token is not configured")]
    MissingProjectToken,

    #[error("invalid gateway base url: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
}

/// The merchant's shared secret with the gateway.
///
/// Never empty. Its `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct ProjectToken(Box<str>);

impl ProjectToken {
    /// Wrap a token, rejecting empty or whitespace-only values.
    pub fn new(token: impl Into<String>) -> Result<Self, ConfigError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ConfigError::MissingProjectToken);
        }
        Ok(Self(token.into_boxed_str()))
    }

    /// The raw token, for signing.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ProjectToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ProjectToken(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_token_is_a_configuration_error() {
        assert!(matches!(
            ProjectToken::new(""),
            Err(ConfigError::MissingProjectToken)
        ));
        assert!(matches!(
            ProjectToken::new("   "),
            Err(ConfigError::MissingProjectToken)
        ));
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = ProjectToken::new("super-secret").unwrap();
        assert_eq!(token.expose(), "super-secret");
        assert!(!format!("{token:?}").contains("super-secret"));
    }
}
