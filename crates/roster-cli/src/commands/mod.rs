//! CLI command implementations.

pub mod config;
pub mod crawl;

use anyhow::{Context, Result};
use roster_core::AppConfig;

use crate::Cli;

/// Load the configuration named on the command line, or the default one,
/// with `ROSTER_*` overrides applied.
pub fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AppConfig::load().context("Failed to load config")?,
    };
    config.apply_env_overrides();
    config.validate().context("Invalid configuration")?;
    Ok(config)
}
