//! Premium engine HTTP server.
//!
//! Environment:
//! - `PREMIUM_ENGINE_CONFIG`: organization config directory (default `./config/sample_org`)
//! - `PREMIUM_ENGINE_ADDR`: bind address (default `0.0.0.0:3000`)
//! - `RUST_LOG`: log filter (default `info`)

use premium_engine::api::{AppState, create_router};
use premium_engine::config::ConfigLoader;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_DIR: &str = "./config/sample_org";
const DEFAULT_ADDR: &str = "0.0.0.0:3000";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(error = %error, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config_dir =
        std::env::var("PREMIUM_ENGINE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_DIR.to_string());
    let addr = std::env::var("PREMIUM_ENGINE_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());

    let config = ConfigLoader::load(&config_dir)?;
    info!(
        config_dir = %config_dir,
        organization_id = %config.organization().id,
        employees = config.config().employees().len(),
        "Configuration loaded"
    );

    let state = AppState::from_config(&config)?;
    let router = create_router(state);

    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Premium engine listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
