use anyhow::Result;
use syncboard_core::{config::Config, server, telemetry};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    // Initialize tracing and the metrics recorder
    let metrics_handle = telemetry::init(&config.telemetry);

    info!("Starting Syncboard Core Service");
    info!("HTTP server listening on {}", config.http_addr());

    // Run the server
    server::run(config, metrics_handle).await
}
