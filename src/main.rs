//! Gamevault main entry point
//!
//! This is the command-line interface for the local game catalogue.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use gamevault::config::{load_config_with_hash, Config};
use gamevault::crawler::{Coordinator, RefreshMode};
use gamevault::output::{
    load_statistics, print_diff_report, print_failed, print_record, print_record_list,
    print_statistics, RunSummary,
};
use gamevault::resolver::{ChainResolver, LinkResolver, ResolveOutcome};
use gamevault::storage::{open_store, Store};
use gamevault::{FailureKind, VaultError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Gamevault: a local catalogue of games from a listing site
///
/// Gamevault scrapes the listing and every game page into a local SQLite
/// database, remembers what failed so it can be retried, and detects new
/// and updated games on later runs.
#[derive(Parser, Debug)]
#[command(name = "gamevault")]
#[command(version)]
#[command(about = "A local game catalogue scraper", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE", default_value = "gamevault.toml")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Re-scrape every listed game
    Refresh,

    /// Scrape only new games and games whose version changed
    Update,

    /// Report new, updated and removed games without scraping them
    Check,

    /// Retry every game in the failed set
    Retry,

    /// Search stored games by title
    Search {
        query: String,
    },

    /// Show one stored game
    Show {
        id: String,
    },

    /// List the failed set
    Failed,

    /// Find stored games missing a title or download links
    Quickcheck {
        /// Add incomplete games to the failed set so `retry` picks them up
        #[arg(long)]
        mark: bool,
    },

    /// Delete every stored game and failure; run history is kept
    Clean {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Show store statistics and recent runs
    Stats,

    /// Resolve a stored download link to a direct URL
    Resolve {
        id: String,

        /// Index of the download link, as shown by `show`
        #[arg(long, default_value_t = 0)]
        link: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::debug!("Configuration loaded (hash: {})", config_hash);

    let store: Arc<dyn Store> = Arc::new(open_store(Path::new(&config.store.database_path))?);

    match cli.command {
        Command::Refresh => handle_refresh(&config, store, &config_hash, RefreshMode::Full).await,
        Command::Update => {
            handle_refresh(&config, store, &config_hash, RefreshMode::Incremental).await
        }
        Command::Check => handle_check(&config, store, &config_hash).await,
        Command::Retry => handle_retry(&config, store, &config_hash).await,
        Command::Search { query } => {
            print_record_list(&store.search(&query)?);
            Ok(())
        }
        Command::Show { id } => {
            let record = store.get(&id)?.ok_or(VaultError::NotFound(id))?;
            print_record(&record);
            Ok(())
        }
        Command::Failed => {
            print_failed(&store.list_failed()?);
            Ok(())
        }
        Command::Quickcheck { mark } => handle_quickcheck(store.as_ref(), mark),
        Command::Clean { yes } => handle_clean(store.as_ref(), yes),
        Command::Stats => {
            println!("Database: {}\n", config.store.database_path);
            print_statistics(&load_statistics(store.as_ref())?);
            Ok(())
        }
        Command::Resolve { id, link } => handle_resolve(&config, store.as_ref(), &id, link).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("gamevault=info,warn"),
            1 => EnvFilter::new("gamevault=debug,info"),
            2 => EnvFilter::new("gamevault=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Cancels the returned token on Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing in-flight work");
            token.cancel();
        }
    });
    cancel
}

/// Prints the summary of a finished run, including one cut short by the listing
fn report_run(result: Result<RunSummary, VaultError>) -> anyhow::Result<()> {
    match result {
        Ok(summary) => {
            summary.print();
            Ok(())
        }
        Err(VaultError::ListingIncomplete {
            pages_fetched,
            source,
            summary,
        }) => {
            summary.print();
            bail!(
                "listing crawl stopped after {} page(s): {}; stored games were kept",
                pages_fetched,
                source
            )
        }
        Err(e) => Err(e.into()),
    }
}

/// Handles `refresh` and `update`
async fn handle_refresh(
    config: &Config,
    store: Arc<dyn Store>,
    config_hash: &str,
    mode: RefreshMode,
) -> anyhow::Result<()> {
    let coordinator = Coordinator::from_config(config, store, config_hash)?;
    let cancel = cancel_on_ctrl_c();
    report_run(coordinator.refresh(mode, &cancel).await)
}

/// Handles `retry`
async fn handle_retry(
    config: &Config,
    store: Arc<dyn Store>,
    config_hash: &str,
) -> anyhow::Result<()> {
    let coordinator = Coordinator::from_config(config, store, config_hash)?;
    let cancel = cancel_on_ctrl_c();
    report_run(coordinator.retry(&cancel).await)
}

/// Handles `check`
async fn handle_check(
    config: &Config,
    store: Arc<dyn Store>,
    config_hash: &str,
) -> anyhow::Result<()> {
    let coordinator = Coordinator::from_config(config, store, config_hash)?;
    let cancel = cancel_on_ctrl_c();
    let report = coordinator.check(&cancel).await?;
    print_diff_report(&report);
    Ok(())
}

/// Handles `quickcheck`
fn handle_quickcheck(store: &dyn Store, mark: bool) -> anyhow::Result<()> {
    let incomplete = store.find_incomplete()?;
    if incomplete.is_empty() {
        println!("All stored games are complete.");
        return Ok(());
    }

    for record in &incomplete {
        let reason = if record.download_links.is_empty() {
            "no download links"
        } else {
            "no title"
        };
        println!("  - {} ({})", record.id, reason);
        if mark {
            store.mark_failed(
                &record.id,
                &record.page_url,
                record.version.as_deref(),
                FailureKind::Incomplete,
                reason,
            )?;
        }
    }

    println!("\n{} incomplete game(s)", incomplete.len());
    if mark {
        println!("Marked as failed; run `gamevault retry` to re-scrape them.");
    }
    Ok(())
}

/// Handles `clean`
fn handle_clean(store: &dyn Store, yes: bool) -> anyhow::Result<()> {
    if !yes {
        bail!("refusing to delete the catalogue without --yes");
    }
    store.delete_all()?;
    println!("Catalogue cleared.");
    Ok(())
}

/// Handles `resolve`
async fn handle_resolve(
    config: &Config,
    store: &dyn Store,
    id: &str,
    index: usize,
) -> anyhow::Result<()> {
    let record = store
        .get(id)?
        .ok_or_else(|| VaultError::NotFound(id.to_string()))?;
    let Some(link) = record.download_links.get(index) else {
        bail!(
            "{} has {} download link(s), no index {}",
            id,
            record.download_links.len(),
            index
        );
    };

    let resolver = ChainResolver::from_config(config.resolver.as_ref());
    match resolver.resolve(link).await {
        ResolveOutcome::Resolved(url) => {
            println!("{}", url);
            Ok(())
        }
        ResolveOutcome::Timeout => bail!("resolving {} timed out", link.url),
        ResolveOutcome::Failed(reason) => bail!("could not resolve {}: {}", link.url, reason),
    }
}
