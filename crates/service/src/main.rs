//! Blob Sidecar Service
//!
//! REST API building blob sidecars with KZG commitment inclusion proofs.

mod api;
mod config;
mod state;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use sidecar_gen::ChainSpec;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env if present
    let _ = dotenvy::dotenv();

    let args = config::Args::parse();

    // Initialize tracing
    let registry =
        tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::from_default_env());
    if args.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let service_config = args.service_config()?;

    tracing::info!("Starting blob sidecar service");
    tracing::info!(
        max_blob_commitments = service_config.chain.max_blob_commitments_per_block,
        body_length = service_config.chain.body_length,
        proof_depth = service_config.chain.inclusion_proof_depth(),
        "Chain config"
    );
    tracing::info!(listen = %args.listen, "API server");

    let metrics_addr: SocketAddr = args
        .metrics_listen
        .parse()
        .with_context(|| format!("Invalid metrics address {}", args.metrics_listen))?;
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .context("Failed to install Prometheus exporter")?;
    sidecar_gen::telemetry::describe();
    tracing::info!(address = %metrics_addr, "Metrics exporter listening");

    // Initialize application state
    let app_state = state::AppState::new(service_config);

    // Start API server
    let api_handle = tokio::spawn(api::run_server(args.listen.clone(), app_state));

    // Wait for shutdown
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal");
        }
        result = api_handle => {
            match result {
                Ok(Err(e)) => tracing::error!(error = %e, "API server error"),
                Err(e) => tracing::error!(error = %e, "API server task failed"),
                Ok(Ok(())) => {}
            }
        }
    }

    Ok(())
}
