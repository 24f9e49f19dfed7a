//! Service Configuration
//!
//! Command-line flags with environment fallbacks, plus the optional chain
//! config file overriding the compiled preset.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use sidecar_gen::ChainConfig;

#[derive(Parser, Debug, Clone)]
#[command(name = "sidecar-service")]
#[command(about = "Blob sidecar builder with KZG commitment inclusion proofs")]
pub struct Args {
    /// API listen address
    #[arg(long, env = "SIDECAR_LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: String,

    /// Metrics listen address
    #[arg(long, env = "SIDECAR_METRICS_LISTEN", default_value = "0.0.0.0:9090")]
    pub metrics_listen: String,

    /// Chain config JSON file (defaults to the compiled preset)
    #[arg(long, env = "SIDECAR_CHAIN_CONFIG")]
    pub chain_config: Option<PathBuf>,

    /// Build sidecars locally
    #[arg(long, env = "SIDECAR_LOCAL_BUILDER", default_value_t = true, action = ArgAction::Set)]
    pub local_builder: bool,

    /// Maximum time for one sidecar build, in milliseconds
    #[arg(long, env = "SIDECAR_BUILD_TIMEOUT_MS", default_value_t = 2500)]
    pub build_timeout_ms: u64,

    /// Number of slots of build records kept for `/builds/{slot}`
    #[arg(long, env = "SIDECAR_BUILD_HISTORY", default_value_t = 64)]
    pub build_history: u64,

    /// Emit logs as JSON
    #[arg(long, env = "SIDECAR_LOG_JSON")]
    pub log_json: bool,
}

/// Runtime configuration shared with the handlers.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub chain: ChainConfig,
    pub local_builder: bool,
    pub build_timeout: Duration,
    pub build_history: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            chain: ChainConfig::default(),
            local_builder: true,
            build_timeout: Duration::from_millis(2500),
            build_history: 64,
        }
    }
}

impl Args {
    /// Resolve flags into the runtime configuration.
    pub fn service_config(&self) -> Result<ServiceConfig> {
        let chain = match &self.chain_config {
            Some(path) => load_chain_config(path)?,
            None => ChainConfig::default(),
        };

        Ok(ServiceConfig {
            chain,
            local_builder: self.local_builder,
            build_timeout: Duration::from_millis(self.build_timeout_ms),
            build_history: self.build_history,
        })
    }
}

/// Read and validate a chain config JSON file.
pub fn load_chain_config(path: &Path) -> Result<ChainConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read chain config {}", path.display()))?;
    let config: ChainConfig = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse chain config {}", path.display()))?;
    config.validate().context("Invalid chain config")?;
    Ok(config)
}
