//! Ripple-Links main entry point
//!
//! This is the command-line interface for the Ripple-Links crawler. Events are
//! written to stdout as newline-delimited JSON; logs and the summary go to
//! stderr.

use anyhow::Context;
use clap::Parser;
use ripple_links::config::{load_config_with_hash, Config};
use ripple_links::crawler::{CrawlEvent, Crawler, Transport};
use ripple_links::output::{print_summary, JsonLinesWriter, OutputHandler, ResultAggregator};
use ripple_links::url::{AllowAll, OutboundGate, PublicNetworkGate};
use ripple_links::CrawlState;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tracing_subscriber::EnvFilter;

/// Ripple-Links: a budget-bounded link checker
///
/// Ripple-Links walks links breadth-first from a set of seed URLs, follows
/// every link through its redirect chain, and reports one result per link.
#[derive(Parser, Debug)]
#[command(name = "ripple-links")]
#[command(version = "1.0.0")]
#[command(about = "A budget-bounded link checker", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Do not print the summary when the crawl ends
    #[arg(long)]
    no_summary: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config).map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let state = handle_crawl(config, !cli.no_summary && !cli.quiet).await?;
    if state == CrawlState::Failed {
        anyhow::bail!("crawl failed");
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ripple_links=info,warn"),
            1 => EnvFilter::new("ripple_links=debug,info"),
            2 => EnvFilter::new("ripple_links=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config) {
    let crawl = &config.crawl;

    println!("=== Ripple-Links Dry Run ===\n");

    println!("Crawl:");
    println!("  Recursive: {}", crawl.recursive);
    println!("  Max URLs: {}", crawl.max_urls);
    println!("  Max depth: {}", crawl.max_depth);
    println!("  Rate limit: {} pages/sec", crawl.rate_limit);
    println!("  Same domain only: {}", crawl.same_domain_only);
    if !crawl.url_filter.is_empty() {
        println!("  URL filter: {}", crawl.url_filter);
    }
    if !crawl.path_include.is_empty() {
        println!("  Include paths: {}", crawl.path_include);
    }
    if !crawl.path_exclude.is_empty() {
        println!("  Exclude paths: {}", crawl.path_exclude);
    }

    let settings = crawl.settings.clamped();
    println!("\nRequests:");
    println!("  Timeout: {}s", settings.timeout);
    println!("  Retries: {}", settings.retries);
    for name in settings.headers.keys() {
        println!("  Header: {}", name);
    }

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!(
        "\nOutbound gate: {}",
        if config.gate.allow_private {
            "allow all"
        } else {
            "public network only"
        }
    );

    println!("\nSeeds ({}):", crawl.urls.len());
    for seed in &crawl.urls {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, show_summary: bool) -> anyhow::Result<CrawlState> {
    let gate: Arc<dyn OutboundGate> = if config.gate.allow_private {
        tracing::warn!("Outbound gate disabled: private network addresses will be fetched");
        Arc::new(AllowAll)
    } else {
        Arc::new(PublicNetworkGate)
    };
    let transport =
        Transport::new(&config.user_agent, gate).context("Failed to build HTTP clients")?;

    tracing::info!("Total seed URLs: {}", config.crawl.urls.len());

    let crawler = Crawler::new(transport);
    let mut stream = crawler.start(config.crawl);

    let mut writer = JsonLinesWriter::new(io::stdout());
    let mut aggregator = ResultAggregator::new();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            event = stream.next() => {
                let Some(event) = event else {
                    break;
                };
                if let CrawlEvent::Error { message } = &event {
                    tracing::error!("Crawl error: {}", message);
                }
                writer.record_event(&event)?;
                aggregator.record_event(&event)?;
            }
            _ = &mut ctrl_c => {
                tracing::warn!("Interrupted, cancelling crawl");
                break;
            }
        }
    }

    let state = stream.finish().await;
    writer.finalize(state)?;
    aggregator.finalize(state)?;

    tracing::info!("Crawl finished: {}", state);
    if show_summary {
        print_summary(&aggregator.summary())?;
    }

    Ok(state)
}
