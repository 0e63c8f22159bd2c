//! Kindle ranking watcher CLI
//!
//! Local execution entry point, suitable for cron or a CI schedule.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ranking_watch::{
    error::{AppError, Result},
    models::{Config, Snapshot},
    pipeline::{RankingPipeline, RunOptions},
    services::{Fetcher, RankingExtractor},
    storage::{HistoryStorage, LocalHistoryStore},
};

/// ranking-watch - Kindle bestseller ranking watcher
#[derive(Parser, Debug)]
#[command(
    name = "ranking-watch",
    version,
    about = "Tracks the Kindle bestseller ranking and reports what moved"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch, compare, save and send
    Run {
        /// Print the message instead of saving and sending
        #[arg(long)]
        dry_run: bool,

        /// Number of items to extract
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Fetch and print the current ranking only
    Fetch {
        /// Number of items to extract
        #[arg(short, long)]
        limit: Option<usize>,

        /// Print JSON records instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show the stored history window
    History,

    /// Validate configuration
    Validate,
}

/// Initialize logging from the verbosity flag or the configured level.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let mut config = Config::load_or_default(&cli.config);
    config.apply_env();
    init_logging(cli.verbose, &config.logging.level);

    if let Err(e) = execute(cli.command, &config).await {
        log::error!("{}", e);
        std::process::exit(e.exit_code());
    }
}

async fn execute(command: Command, config: &Config) -> Result<()> {
    match command {
        Command::Run { dry_run, limit } => {
            log::info!("ranking-watch starting...");
            let pipeline = RankingPipeline::from_config(config, !dry_run)?;
            let report = pipeline.run(RunOptions { dry_run, limit }).await?;

            if dry_run {
                println!("{}", report.message);
            } else if report.first_run {
                log::info!("First run: recorded {} item(s)", report.snapshot.len());
            } else if let Some(analysis) = &report.analysis {
                log::info!("Done: {} change(s) reported", analysis.change_count());
            }
        }

        Command::Fetch { limit, json } => {
            config.validate()?;
            if limit == Some(0) {
                return Err(AppError::validation("--limit must be > 0"));
            }
            let fetcher = Fetcher::from_config(&config.fetch)?;
            let extractor = RankingExtractor::new(&config.extract)?;

            let document = fetcher.fetch(&config.fetch.source_url).await?;
            let items = extractor.extract_with_limit(
                &document.body,
                limit.unwrap_or(config.extract.limit),
            )?;
            let snapshot = Snapshot::capture(items);

            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot.records())?);
            } else {
                println!("{}", snapshot.render());
            }
        }

        Command::History => {
            let store = LocalHistoryStore::new(&config.history.path, config.history.max_entries);
            let window = store.load().await;

            if window.is_empty() {
                println!("No history at {}", store.path().display());
                return Ok(());
            }

            println!("History: {}", store.path().display());
            println!("  Snapshots: {}/{}", window.len(), window.capacity());
            for (i, snapshot) in window.iter().enumerate() {
                let top = snapshot
                    .items
                    .first()
                    .map(|item| item.title.as_str())
                    .unwrap_or("-");
                println!(
                    "  [{}] {} ({} items, #1: {})",
                    i,
                    snapshot.timestamp.to_rfc3339(),
                    snapshot.len(),
                    top
                );
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            config.validate()?;
            RankingExtractor::new(&config.extract)?;

            match config.validate_delivery() {
                Ok(()) => println!("Configuration is valid"),
                Err(AppError::Config(message)) => {
                    println!("Configuration is valid for dry runs only: {}", message)
                }
                Err(e) => return Err(e),
            }
        }
    }

    Ok(())
}
