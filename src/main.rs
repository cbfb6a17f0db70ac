//! ATC Harvester main entry point
//!
//! Command-line interface for scanning the tabletki.ua ATC tree and drug
//! catalogue.

use atc_harvester::config::{load_config_with_hash, validate, Config};
use atc_harvester::crawler::{
    scan_atc_tree, scan_drugs, spawn_progress_reporter, DocumentFetcher, HttpFetcher, RunProgress,
};
use atc_harvester::sink::{CsvSink, JsonTreeSink, SqliteSink, SqliteTreeSink};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// ATC Harvester: scrapes the tabletki.ua drug catalogue
///
/// In debug mode the drugs go to a CSV file and the ATC tree to a JSON
/// file. With --prod both are written to a SQLite database.
#[derive(Parser, Debug)]
#[command(name = "atc-harvester")]
#[command(version)]
#[command(about = "Scrapes the tabletki.ua ATC classification and drug catalogue", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Save results to the database instead of files
    #[arg(long, global = true)]
    prod: bool,

    /// Number of workers for the dosage and drug stages
    #[arg(short, long, value_name = "N", global = true)]
    workers: Option<usize>,

    /// CSV file for drugs (debug mode)
    #[arg(long, value_name = "FILE", global = true)]
    csvfile: Option<PathBuf>,

    /// JSON file for the ATC tree (debug mode)
    #[arg(long, value_name = "FILE", global = true)]
    jsonfile: Option<PathBuf>,

    /// SQLite database file (production mode)
    #[arg(long, value_name = "FILE", global = true)]
    database: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Scan the ATC classification tree
    Atctree,
    /// Scan drugs
    Drugs,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let Some(command) = cli.command else {
        tracing::info!("No subcommand selected");
        return Ok(());
    };

    let started = Instant::now();
    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Err(e) = run(command, &config).await {
        tracing::error!("Run failed: {}", e);
        return Err(e.into());
    }

    tracing::info!("Elapsed time: {:?}", started.elapsed());
    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("atc_harvester=info,warn"),
            1 => EnvFilter::new("atc_harvester=debug,info"),
            2 => EnvFilter::new("atc_harvester=trace,debug"),
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

/// Loads the config file if one was given, then applies CLI overrides
fn resolve_config(cli: &Cli) -> atc_harvester::ConfigResult<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    if cli.prod {
        config.output.production = true;
    }
    if let Some(workers) = cli.workers {
        config.crawler.workers = workers;
    }
    if let Some(path) = &cli.csvfile {
        config.output.csv_path = path.display().to_string();
    }
    if let Some(path) = &cli.jsonfile {
        config.output.json_path = path.display().to_string();
    }
    if let Some(path) = &cli.database {
        config.output.database_path = path.display().to_string();
    }

    validate(&config)?;
    Ok(config)
}

async fn run(command: Command, config: &Config) -> atc_harvester::Result<()> {
    let fetcher: Arc<dyn DocumentFetcher> = Arc::new(HttpFetcher::from_config(&config.crawler)?);
    let progress = Arc::new(RunProgress::new());

    let reporter = (config.crawler.progress_interval_secs > 0).then(|| {
        spawn_progress_reporter(
            Arc::clone(&progress),
            Duration::from_secs(config.crawler.progress_interval_secs),
        )
    });

    let result = match command {
        Command::Atctree => handle_atc_tree(config, fetcher, Arc::clone(&progress)).await,
        Command::Drugs => handle_drugs(config, fetcher, Arc::clone(&progress)).await,
    };

    if let Some(reporter) = reporter {
        reporter.abort();
    }
    progress.log();
    result
}

async fn handle_atc_tree(
    config: &Config,
    fetcher: Arc<dyn DocumentFetcher>,
    progress: Arc<RunProgress>,
) -> atc_harvester::Result<()> {
    let output = &config.output;
    // Sinks open before the crawl starts, so a bad path fails the run up front
    let tree = if output.production {
        let mut sink = SqliteTreeSink::open(Path::new(&output.database_path))?;
        scan_atc_tree(config, fetcher, &mut sink, progress).await?
    } else {
        let mut sink = JsonTreeSink::create(&output.json_path)?;
        scan_atc_tree(config, fetcher, &mut sink, progress).await?
    };

    tracing::info!("Saved ATC tree with {} nodes", tree.node_count());
    Ok(())
}

async fn handle_drugs(
    config: &Config,
    fetcher: Arc<dyn DocumentFetcher>,
    progress: Arc<RunProgress>,
) -> atc_harvester::Result<()> {
    let output = &config.output;
    // Sinks open before any stage starts, so a bad path fails the run up front
    let total = if output.production {
        let mut sink = SqliteSink::open(Path::new(&output.database_path), output.batch_size)?;
        scan_drugs(config, fetcher, &mut sink, progress).await?
    } else {
        let mut sink = CsvSink::create(Path::new(&output.csv_path))?;
        scan_drugs(config, fetcher, &mut sink, progress).await?
    };

    tracing::info!("Saved {} drugs", total);
    Ok(())
}
