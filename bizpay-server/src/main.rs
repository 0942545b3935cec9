//! BizPay callback server
//!
//! Receives payment gateway callbacks and decides whether they can be trusted.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use bizpay_core::{CallbackVerifier, OrderLookup};
use bizpay_sdk::Signer;
use bizpay_sdk::client::GatewayClient;
use clap::Parser;
use config::ConfigLoader;
use server::{build_router, run_server};
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// BizPay callback verifier - trust boundary for payment gateway callbacks
#[derive(Parser, Debug)]
#[command(name = "bizpay-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./bizpay-config.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Project token, overriding the one in the configuration file
    #[arg(long, env = "BIZPAY_PROJECT_TOKEN", hide_env_values = true)]
    project_token: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    tracing::info!("Starting bizpay-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader =
        ConfigLoader::new(&args.config, args.listen).with_project_token(args.project_token);
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!("Configuration loaded from {:?}", args.config);

    // Gateway client, bounded by the lookup timeout
    let http = reqwest::Client::builder()
        .timeout(loaded_config.lookup_timeout)
        .build()?;
    let client = GatewayClient::new(&loaded_config.gateway).with_http_client(http);
    tracing::info!(
        base_url = %client.base_url(),
        environment = ?loaded_config.gateway.environment,
        "Gateway client ready"
    );

    let lookup: Arc<dyn OrderLookup> = Arc::new(client);
    let verifier = CallbackVerifier::new(
        Signer::new(loaded_config.gateway.project_token.clone()),
        lookup,
    )
    .with_lookup_timeout(loaded_config.lookup_timeout)
    .with_locale(loaded_config.locale);

    // Build the router
    let router = build_router(AppState::new(verifier));

    // Run the server
    tracing::info!("Starting HTTP server on {}", loaded_config.listen);
    let result = run_server(router, loaded_config.listen).await;
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bizpay_core=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
