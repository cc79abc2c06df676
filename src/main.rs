//! Offer-Radar main entry point
//!
//! This is the command-line interface for the Offer-Radar listing tracker.

use anyhow::Context;
use clap::{Parser, Subcommand};
use offer_radar::config::{load_config_with_hash, validate, Config};
use offer_radar::storage::open_storage;
use offer_radar::{OfferStore, OfferTracker};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Offer-Radar: a vehicle listing tracker
///
/// Offer-Radar re-walks a saved search on a listings site, fetches detail
/// pages for listings it has never seen, and ages out listings that stopped
/// appearing in the results.
#[derive(Parser, Debug)]
#[command(name = "offer-radar")]
#[command(version)]
#[command(about = "Tracks vehicle listings behind a saved search", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults if omitted)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

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
    /// Run one update pass for a saved search
    Update {
        /// The saved search URL to walk
        #[arg(value_name = "SEARCH_URL")]
        search_url: String,

        /// Override the database path from the config
        #[arg(long, value_name = "PATH")]
        db: Option<PathBuf>,

        /// Override the number of detail-fetch workers
        #[arg(long)]
        workers: Option<u32>,

        /// Override the per-request pause, in seconds
        #[arg(long, value_name = "SECONDS")]
        pause: Option<f64>,
    },

    /// Show aggregate statistics from the database
    Stats {
        /// Override the database path from the config
        #[arg(long, value_name = "PATH")]
        db: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    let (config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (cfg, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        None => {
            tracing::debug!("No config file given, using built-in defaults");
            (Config::default(), "builtin".to_string())
        }
    };

    match cli.command {
        Command::Update {
            search_url,
            db,
            workers,
            pause,
        } => handle_update(config, config_hash, &search_url, db, workers, pause).await,
        Command::Stats { db } => handle_stats(config, db),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("offer_radar=info,warn"),
            1 => EnvFilter::new("offer_radar=debug,info"),
            2 => EnvFilter::new("offer_radar=trace,debug"),
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

/// Handles the `update` subcommand: runs one pass and prints its summary
async fn handle_update(
    mut config: Config,
    config_hash: String,
    search_url: &str,
    db: Option<PathBuf>,
    workers: Option<u32>,
    pause: Option<f64>,
) -> anyhow::Result<()> {
    if let Some(db) = db {
        config.output.database_path = db.display().to_string();
    }
    if let Some(workers) = workers {
        config.scraper.workers = workers;
    }
    if let Some(pause) = pause {
        config.scraper.pause_ms = (pause * 1000.0).round() as u64;
    }

    // CLI overrides go through the same checks as the config file
    validate(&config).context("invalid settings after command-line overrides")?;

    let store = open_storage(Path::new(&config.output.database_path))
        .with_context(|| format!("failed to open database {}", config.output.database_path))?;

    let mut tracker = OfferTracker::new(store, &config, config_hash)?;
    let stats = tracker.update(search_url).await?;

    println!("=== Update pass for {} ===\n", search_url);
    println!("  Listings in search results: {}", stats.total_found);
    println!("  New offers:                 {}", stats.new_offers);
    println!("  Updated offers:             {}", stats.updated_offers);
    println!("  Deactivated offers:         {}", stats.inactive_offers);
    println!("  Failed detail fetches:      {}", stats.failed_fetches);
    println!("  Active offers in store:     {}", stats.total_active);
    println!("\nDone in {:.1}s", stats.duration.as_secs_f64());

    Ok(())
}

/// Handles the `stats` subcommand: shows aggregate counts from the database
fn handle_stats(mut config: Config, db: Option<PathBuf>) -> anyhow::Result<()> {
    if let Some(db) = db {
        config.output.database_path = db.display().to_string();
    }

    println!("Database: {}\n", config.output.database_path);

    let store = open_storage(Path::new(&config.output.database_path))
        .with_context(|| format!("failed to open database {}", config.output.database_path))?;

    let stats = store.store_stats()?;
    println!("  Total offers:     {}", stats.total_offers);
    println!("  Active offers:    {}", stats.active_offers);
    println!("  Inactive offers:  {}", stats.inactive_offers);
    println!("  Tracked searches: {}", stats.tracked_searches);

    if let Some(run) = store.latest_run()? {
        println!("\nLast run: {} ({})", run.started_at, run.status.to_db_string());
        println!("  Search: {}", run.search_url);
        if let Some(finished) = run.finished_at {
            println!("  Finished: {}", finished);
        }
    }

    Ok(())
}
