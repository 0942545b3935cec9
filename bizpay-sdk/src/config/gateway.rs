//! Gateway connection configuration.

use serde::{Deserialize, Serialize};
use url::Url;

use super::{ConfigError, ProjectToken};

/// Which gateway deployment to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Sandbox,
}

impl Environment {
    pub const fn base_url(self) -> &'static str {
        match self {
            Environment::Production => "https://pay.bizfly.vn/",
            Environment::Sandbox => "https://pay.todo.vn/",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Production => write!(f, "production"),
            Environment::Sandbox => write!(f, "sandbox"),
        }
    }
}

/// Everything needed to sign for and talk to the gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Shared secret used by every signature domain.
    pub project_token: ProjectToken,
    /// Merchant client id, reserved for the gateway's administrative API.
    ///
    /// Callback verification and the order endpoints authenticate with the
    /// project token alone and never read it.
    pub client_id: Option<String>,
    pub environment: Environment,
    /// Root of the gateway API, always ending in `/`.
    pub base_url: Url,
}

impl GatewayConfig {
    /// Create a config pointing at the default URL of `environment`.
    pub fn new(project_token: ProjectToken, environment: Environment) -> Self {
        Self {
            project_token,
            client_id: None,
            environment,
            base_url: default_base_url(environment),
        }
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Override the base URL (e.g. a local mock of the gateway).
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, ConfigError> {
        let mut url = Url::parse(base_url)?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        self.base_url = url;
        Ok(self)
    }
}

// Both constants are valid absolute URLs.
#[allow(clippy::expect_used)]
fn default_base_url(environment: Environment) -> Url {
    Url::parse(environment.base_url()).expect("static gateway url")
}
