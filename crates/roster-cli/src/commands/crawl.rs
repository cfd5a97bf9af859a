//! Crawl command - enumerate a letter range.

use anyhow::{Context, Result};
use clap::Args;
use roster_browser::BrowserEngine;
use roster_core::{AppConfig, Record};
use roster_crawler::{CrawlOrchestrator, EnumerationEngine, StdinApproval};
use std::io::Write;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::load_config;
use crate::Cli;

/// Arguments for the crawl command.
#[derive(Args)]
pub struct CrawlArgs {
    /// First letter of the range.
    #[arg(long, default_value_t = 'a')]
    pub from: char,

    /// Last letter of the range (inclusive).
    #[arg(long, default_value_t = 'z')]
    pub to: char,

    /// Open every entry's detail view (needs a manual login).
    #[arg(long, conflicts_with = "listing_only")]
    pub details: bool,

    /// Emit listing names only, no login needed.
    #[arg(long)]
    pub listing_only: bool,

    /// Parallel browsing contexts, each walking its own letter slice.
    #[arg(long, short)]
    pub workers: Option<usize>,

    /// Run the browser without a window. Manual login needs a window.
    #[arg(long)]
    pub headless: bool,
}

/// Runs the crawl command.
pub async fn run(args: &CrawlArgs, cli: &Cli) -> Result<()> {
    let mut config = load_config(cli)?;
    if let Some(workers) = args.workers {
        config.crawl.workers = workers;
    }
    if args.headless {
        config.browser.headless = true;
    }
    config.validate().context("Invalid crawl options")?;

    let resolve_details = if args.details {
        true
    } else if args.listing_only {
        false
    } else {
        config.crawl.resolve_details
    };
    if resolve_details && config.browser.headless {
        tracing::warn!("Detail crawl in headless mode: the login page will not be visible");
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping the crawl");
            on_interrupt.cancel();
        }
    });

    let mut browsers = Vec::new();
    let outcome = crawl(args, &config, resolve_details, &cancel, &mut browsers).await;

    for browser in browsers {
        if let Err(e) = browser.close().await {
            tracing::warn!("Failed to close browser: {}", e);
        }
    }

    outcome
}

async fn crawl(
    args: &CrawlArgs,
    config: &AppConfig,
    resolve_details: bool,
    cancel: &CancellationToken,
    browsers: &mut Vec<Arc<BrowserEngine>>,
) -> Result<()> {
    let mut engines = Vec::with_capacity(config.crawl.workers);
    for worker in 0..config.crawl.workers {
        let browser = Arc::new(
            BrowserEngine::launch(&config.browser)
                .await
                .context("Failed to launch browser")?,
        );
        browsers.push(browser.clone());

        let engine = EnumerationEngine::new(browser, config, cancel.child_token())?;
        if resolve_details {
            tracing::info!("Logging in browsing context {}", worker + 1);
            engine.session().authenticate(&StdinApproval).await?;
        }
        engines.push(engine);
    }

    if let [engine] = engines.as_slice() {
        return stream_records(engine, args, resolve_details).await;
    }

    let orchestrator = CrawlOrchestrator::new(engines);
    match orchestrator.run(args.from, args.to, resolve_details).await {
        Ok(report) => {
            print_records(&report.records)?;
            tracing::info!(
                "Crawl {} finished: {} records, {} queries, {} duplicates dropped",
                report.crawl_id,
                report.records.len(),
                report.stats.queries,
                report.stats.duplicates
            );
            Ok(())
        }
        Err(interrupted) => {
            print_records(&interrupted.report.records)?;
            Err(interrupted.cause).context(format!(
                "Crawl stopped after {} records",
                interrupted.report.records.len()
            ))
        }
    }
}

/// Print records as they are found.
async fn stream_records(engine: &EnumerationEngine, args: &CrawlArgs, resolve_details: bool) -> Result<()> {
    let mut walk = engine.enumerate(args.from, args.to, resolve_details).await?;
    let mut stdout = std::io::stdout().lock();

    let outcome = loop {
        match walk.next_record().await {
            Ok(Some(record)) => {
                writeln!(stdout, "{}", serde_json::to_string(&record)?)?;
            }
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        }
    };
    stdout.flush()?;

    let stats = walk.stats();
    tracing::info!(
        "{} records, {} queries, {} subdivisions, {} readiness timeouts",
        stats.records,
        stats.queries,
        stats.subdivisions,
        stats.readiness_timeouts
    );

    outcome.with_context(|| format!("Crawl stopped after {} records", stats.records))
}

fn print_records(records: &[Record]) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    for record in records {
        writeln!(stdout, "{}", serde_json::to_string(record)?)?;
    }
    stdout.flush()?;
    Ok(())
}
