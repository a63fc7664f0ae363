use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use serving_bridge::client::GrpcPredictor;
use serving_bridge::config::{BridgeConfig, CliArgs};
use serving_bridge::server;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Initialize logging to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .init();

    let config = BridgeConfig::from(&args);
    config.validate()?;

    // The channel connects lazily; an unreachable backend only shows up per request
    let predictor = GrpcPredictor::from_config(&config)?;
    tracing::info!(endpoint = %predictor.endpoint(), model = %config.model_name, "Prediction client ready");

    if let Err(e) = server::serve(config, Arc::new(predictor)).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
