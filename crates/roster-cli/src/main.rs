// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! Roster CLI - enumerate a capped directory search from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Every professor, with detail views (asks for a manual login first)
//! roster crawl
//!
//! # Names only for last names starting with a through c
//! roster crawl --from a --to c --listing-only
//!
//! # Four browser windows working on separate letter slices
//! roster crawl --workers 4
//!
//! # Where the configuration lives
//! roster config --path
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{config, crawl};

/// Roster CLI - complete enumeration of a capped directory search.
#[derive(Parser)]
#[command(name = "roster")]
#[command(about = "Enumerate every entry of a capped directory search")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to the platform config directory).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output (debug logs from every crate).
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Walk a letter range and print one JSON record per line.
    Crawl(crawl::CrawlArgs),

    /// Show the configuration or its location.
    Config(config::ConfigArgs),
}

/// Logs go to stderr; stdout carries records only.
fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug,chromiumoxide=warn" } else { "info,roster=debug" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let result = match &cli.command {
        Commands::Crawl(args) => crawl::run(args, &cli).await,
        Commands::Config(args) => config::run(args, &cli),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }

    Ok(())
}
