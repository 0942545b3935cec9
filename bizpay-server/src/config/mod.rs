//! Configuration module for bizpay-server.
//!
//! Handles loading configuration from the TOML file, CLI arguments,
//! and environment variables.

pub mod file;

use crate::config::file::FileConfig;
use bizpay_core::verifier::Locale;
use bizpay_sdk::config::{GatewayConfig, ProjectToken};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("invalid gateway configuration: {0}")]
    Gateway(#[from] bizpay_sdk::config::ConfigError),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Validated configuration ready to build the application from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub listen: SocketAddr,
    pub gateway: GatewayConfig,
    pub lookup_timeout: Duration,
    pub locale: Locale,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    listen_override: Option<SocketAddr>,
    project_token_override: Option<String>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
            project_token_override: None,
        }
    }

    /// Project token taken from the environment, preferred over the file.
    pub fn with_project_token(mut self, token: Option<String>) -> Self {
        self.project_token_override = token;
        self
    }

    /// Load and validate the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI and environment overrides
    /// 3. Validate the configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        self.load_str(&config_content)
    }

    fn load_str(&self, config_content: &str) -> Result<LoadedConfig, ConfigError> {
        let mut file_config: FileConfig = toml::from_str(config_content)?;

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }
        if let Some(token) = &self.project_token_override {
            file_config.gateway.project_token = token.clone();
        }

        self.validate(&file_config)?;
        self.build_loaded_config(file_config)
    }

    fn validate(&self, config: &FileConfig) -> Result<(), ConfigError> {
        if config.gateway.lookup_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "gateway.lookup_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    fn build_loaded_config(&self, file_config: FileConfig) -> Result<LoadedConfig, ConfigError> {
        let gateway = file_config.gateway;
        let project_token = ProjectToken::new(gateway.project_token)?;

        let mut gateway_config = GatewayConfig::new(project_token, gateway.environment);
        if let Some(client_id) = gateway.client_id {
            gateway_config = gateway_config.with_client_id(client_id);
        }
        if let Some(base_url) = &gateway.base_url {
            gateway_config = gateway_config.with_base_url(base_url)?;
        }

        Ok(LoadedConfig {
            listen: file_config.server.listen,
            gateway: gateway_config,
            lookup_timeout: Duration::from_secs(gateway.lookup_timeout_secs),
            locale: file_config.verifier.locale,
        })
    }
}
