//! Config command - inspect configuration.

use anyhow::Result;
use clap::Args;
use roster_core::AppConfig;

use super::load_config;
use crate::Cli;

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    /// Print the effective configuration as TOML (the default).
    #[arg(long)]
    pub show: bool,

    /// Print the default configuration file location.
    #[arg(long)]
    pub path: bool,
}

/// Runs the config command.
pub fn run(args: &ConfigArgs, cli: &Cli) -> Result<()> {
    if args.path {
        match &cli.config {
            Some(path) => println!("{}", path.display()),
            None => println!("{}", AppConfig::config_path()?.display()),
        }
    }

    if args.show || !args.path {
        let config = load_config(cli)?;
        print!("{}", toml::to_string_pretty(&config)?);
    }

    Ok(())
}
