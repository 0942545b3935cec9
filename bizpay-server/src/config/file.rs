//! TOML file configuration structures.
//!
//! These structs directly map to the `bizpay-config.toml` file format.

use bizpay_core::verifier::Locale;
use bizpay_sdk::config::Environment;
use serde::Deserialize;
use std::net::{Ipv4Addr, SocketAddr};

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub verifier: VerifierConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080))
}

/// Gateway connection section.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Shared project token. May be left empty when supplied through
    /// `BIZPAY_PROJECT_TOKEN`.
    #[serde(default)]
    pub project_token: String,
    pub client_id: Option<String>,
    #[serde(default)]
    pub environment: Environment,
    /// Overrides the environment's default base URL.
    pub base_url: Option<String>,
    #[serde(default = "default_lookup_timeout_secs")]
    pub lookup_timeout_secs: u64,
}

fn default_lookup_timeout_secs() -> u64 {
    10
}

/// Verifier section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifierConfig {
    #[serde(default)]
    pub locale: Locale,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config_parsing() {
        let toml_str = r#"
[server]
listen = "127.0.0.1:3000"

[gateway]
project_token = "ypBrkdtM407veJuj1BVGKVmo7x8WsEL5"
client_id = "shop-42"
environment = "sandbox"
base_url = "http://127.0.0.1:9000"
lookup_timeout_secs = 3

[verifier]
locale = "en"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 3000);
        assert_eq!(config.gateway.client_id.as_deref(), Some("shop-42"));
        assert_eq!(config.gateway.environment, Environment::Sandbox);
        assert_eq!(config.gateway.lookup_timeout_secs, 3);
        assert_eq!(config.verifier.locale, Locale::En);
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: FileConfig = toml::from_str("[gateway]\n").unwrap();
        assert_eq!(config.server.listen, default_listen_addr());
        assert!(config.gateway.project_token.is_empty());
        assert_eq!(config.gateway.environment, Environment::Production);
        assert_eq!(config.gateway.lookup_timeout_secs, 10);
        assert_eq!(config.verifier.locale, Locale::Vi);
    }

    #[test]
    fn test_unknown_environment_is_rejected() {
        let result: Result<FileConfig, _> = toml::from_str("[gateway]\nenvironment = \"staging\"\n");
        assert!(result.is_err());
    }
}
