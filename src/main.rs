//! Directory-Harvest main entry point
//!
//! This is the command-line interface for the Directory-Harvest company harvester.

use anyhow::Context;
use clap::Parser;
use directory_harvest::config::{load_config_with_hash, Config};
use directory_harvest::crawler::harvest;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Directory-Harvest: walks a review directory's categories and stores company contacts
///
/// Every sub-category listing is paginated, each listed company profile is
/// parsed, and companies whose email was already contacted are skipped.
#[derive(Parser, Debug)]
#[command(name = "directory-harvest")]
#[command(version)]
#[command(about = "Harvests company profiles from a review directory", long_about = None)]
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

    /// Validate config and show what would be harvested without fetching anything
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_harvest(&config, &config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("directory_harvest=info,warn"),
            1 => EnvFilter::new("directory_harvest=debug,info"),
            2 => EnvFilter::new("directory_harvest=trace,debug"),
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

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Directory-Harvest Dry Run ===\n");

    println!("Site:");
    println!("  Root listing: {}", config.site.root_url());

    println!("\nCrawler:");
    println!(
        "  Max concurrent extractions: {}",
        config.crawler.max_concurrent_extractions
    );
    println!(
        "  Retries per request: {} (delay {}ms)",
        config.crawler.max_retries, config.crawler.retry_delay_ms
    );
    println!("  Start page: {}", config.crawler.start_page);
    match config.crawler.max_main_categories {
        Some(limit) => println!("  Main categories: first {}", limit),
        None => println!("  Main categories: all"),
    }
    match config.crawler.max_pages_per_sub_category {
        Some(limit) => println!("  Pages per sub-category: at most {}", limit),
        None => println!("  Pages per sub-category: until exhausted"),
    }
    println!("  User agent: {}", config.crawler.user_agent);

    println!("\nSelectors:");
    let selectors = &config.selectors;
    println!("  Main category item: {}", selectors.main_category_item);
    println!("  Main category name: {}", selectors.main_category_name);
    println!("  Sub category item:  {}", selectors.sub_category_item);
    println!("  Sub category name:  {}", selectors.sub_category_name);
    println!("  Listing item:       {}", selectors.listing_item);
    println!("  Pagination link:    {}", selectors.pagination_link);
    println!("  Profile payload:    {}", selectors.profile_payload);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use directory_harvest::output::{load_statistics, print_statistics};
    use directory_harvest::storage::SqliteStorage;
    use std::path::Path;

    let db_path = Path::new(&config.output.database_path);
    if !db_path.exists() {
        anyhow::bail!(
            "Database {} does not exist; run a harvest first",
            db_path.display()
        );
    }

    println!("Database: {}\n", db_path.display());

    let storage = SqliteStorage::open_existing(db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    match config.crawler.max_main_categories {
        Some(limit) => tracing::info!("Harvesting the first {} main categories", limit),
        None => tracing::info!("Harvesting all main categories"),
    }

    match harvest(config, config_hash).await {
        Ok(stats) => {
            tracing::info!("Harvest completed: {}", stats);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
