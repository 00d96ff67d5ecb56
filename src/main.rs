//! Listing-Harvester main entry point
//!
//! This is the command-line interface for the classifieds catalogue crawler.

use anyhow::Context;
use clap::{Parser, Subcommand};
use listing_harvester::catalogue::{CrawlOrchestrator, CrawlSettings};
use listing_harvester::config::{load_config_with_hash, Config};
use listing_harvester::harvest::run_batch;
use listing_harvester::output::{
    load_statistics, print_crawl_summary, print_statistics, write_catalogue_json,
};
use listing_harvester::storage::{open_storage, Storage};
use listing_harvester::{FilterCriteria, HttpSession, RegionTable, SearchQuery, ShopQuery};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Listing-Harvester: a classifieds catalogue crawler
///
/// Collects listings from a marketplace search or a seller's storefront,
/// extracts every listing page and keeps the ones that pass the filters.
#[derive(Parser, Debug)]
#[command(name = "listing-harvester")]
#[command(version = "1.0.0")]
#[command(about = "A classifieds catalogue crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
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
    /// Crawl search results for a phrase in a region
    Search {
        /// Search text
        #[arg(long)]
        text: String,

        /// Region name, as listed in the [regions] table
        #[arg(long)]
        region: String,

        /// Catalogue output path (defaults to output.catalogue-path)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Crawl every active listing of a seller's storefront
    Shop {
        /// Storefront URL
        url: String,

        /// Catalogue output path (defaults to output.catalogue-path)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Search every stored phrase in every stored city and store the results
    Batch,

    /// Add harvest inputs to the database
    Seed {
        #[command(subcommand)]
        input: SeedInput,
    },

    /// Show statistics from the database and exit
    Stats,

    /// Validate the configuration and show a summary
    Check,
}

#[derive(Subcommand, Debug)]
enum SeedInput {
    /// Add a search phrase bound to one of our items
    Phrase {
        #[arg(long)]
        item_id: i64,

        #[arg(long)]
        text: String,
    },

    /// Add a city to search in
    City { name: String },

    /// Add a title word that disqualifies listings for a phrase
    ExcludedWord {
        #[arg(long)]
        phrase_id: i64,

        word: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::debug!("Configuration loaded (hash: {})", config_hash);

    match cli.command {
        Command::Search {
            text,
            region,
            output,
        } => handle_search(&config, SearchQuery::new(text, region), output).await,
        Command::Shop { url, output } => handle_shop(&config, ShopQuery::new(url), output).await,
        Command::Batch => handle_batch(&config, &config_hash).await,
        Command::Seed { input } => handle_seed(&config, input),
        Command::Stats => handle_stats(&config),
        Command::Check => handle_check(&config, &config_hash),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("listing_harvester=info,warn"),
            1 => EnvFilter::new("listing_harvester=debug,info"),
            2 => EnvFilter::new("listing_harvester=trace,debug"),
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

fn catalogue_path(config: &Config, output: Option<PathBuf>) -> PathBuf {
    output.unwrap_or_else(|| PathBuf::from(&config.output.catalogue_path))
}

async fn handle_search(
    config: &Config,
    query: SearchQuery,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let session = HttpSession::new(&config.client).context("failed to build HTTP session")?;
    let regions = RegionTable::new(config.regions.clone());
    let orchestrator =
        CrawlOrchestrator::new(&session, &regions, CrawlSettings::from_config(&config.client)?);

    let catalogue = orchestrator
        .crawl_search(&query, &FilterCriteria::from(&config.filters))
        .await
        .with_context(|| format!("search for '{}' in {} failed", query.text, query.region_name))?;

    let path = catalogue_path(config, output);
    write_catalogue_json(&catalogue, &path)
        .with_context(|| format!("failed to write {}", path.display()))?;

    print_crawl_summary(&catalogue);
    println!("\n✓ Catalogue written to: {}", path.display());
    Ok(())
}

async fn handle_shop(config: &Config, query: ShopQuery, output: Option<PathBuf>) -> anyhow::Result<()> {
    let session = HttpSession::new(&config.client).context("failed to build HTTP session")?;
    let regions = RegionTable::new(config.regions.clone());
    let orchestrator =
        CrawlOrchestrator::new(&session, &regions, CrawlSettings::from_config(&config.client)?);

    let catalogue = orchestrator
        .crawl_shop(&query)
        .await
        .with_context(|| format!("shop crawl for {} failed", query.shop_url))?;

    let path = catalogue_path(config, output);
    write_catalogue_json(&catalogue, &path)
        .with_context(|| format!("failed to write {}", path.display()))?;

    print_crawl_summary(&catalogue);
    println!("\n✓ Catalogue written to: {}", path.display());
    Ok(())
}

async fn handle_batch(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    let mut storage = open_storage(Path::new(&config.output.database_path))
        .with_context(|| format!("failed to open {}", config.output.database_path))?;

    let session = HttpSession::new(&config.client).context("failed to build HTTP session")?;
    let regions = RegionTable::new(config.regions.clone());
    let orchestrator =
        CrawlOrchestrator::new(&session, &regions, CrawlSettings::from_config(&config.client)?);

    let summary = run_batch(&orchestrator, &mut storage, &config.filters, config_hash)
        .await
        .context("batch harvest failed")?;

    println!("=== Harvest Run {} ===\n", summary.run_id);
    println!("  Search phrases: {}", summary.phrases);
    println!("  Crawls completed: {}", summary.crawls);
    println!("  Crawls failed: {}", summary.failed_crawls);
    println!("  Cities skipped: {}", summary.skipped_cities);
    println!("  Listings stored: {}", summary.listings);
    Ok(())
}

fn handle_seed(config: &Config, input: SeedInput) -> anyhow::Result<()> {
    let mut storage = open_storage(Path::new(&config.output.database_path))
        .with_context(|| format!("failed to open {}", config.output.database_path))?;

    match input {
        SeedInput::Phrase { item_id, text } => {
            let id = storage.insert_or_get_search_phrase(item_id, &text)?;
            println!("✓ Search phrase '{}' (item {}) has id {}", text, item_id, id);
        }
        SeedInput::City { name } => {
            if !config.regions.contains_key(&name) {
                tracing::warn!("City '{}' has no region id in the configuration", name);
            }
            let id = storage.insert_or_get_city(&name)?;
            println!("✓ City '{}' has id {}", name, id);
        }
        SeedInput::ExcludedWord { phrase_id, word } => {
            storage.add_excluded_word(phrase_id, &word)?;
            println!("✓ Excluded '{}' for search phrase {}", word, phrase_id);
        }
    }

    Ok(())
}

fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))
        .with_context(|| format!("failed to open {}", config.output.database_path))?;

    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Shows what the configuration resolves to without making any request
fn handle_check(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    println!("=== Listing-Harvester Configuration ===\n");

    println!("Client:");
    println!("  Base URL: {}", config.client.base_url);
    println!("  User agent: {}", config.client.user_agent);
    println!(
        "  Cookie: {}",
        if config.client.cookie.is_some() {
            "set"
        } else {
            "not set"
        }
    );
    println!("  Timeout: {}s", config.client.timeout_secs);
    println!("  Request delay: {}ms", config.client.request_delay_ms);
    println!(
        "  Index retries: {} (backoff {}ms)",
        config.client.index_retries, config.client.retry_backoff_ms
    );

    println!("\nFilters:");
    println!(
        "  Require new condition: {}",
        config.filters.require_new_condition
    );
    println!("  Excluded words: {}", config.filters.excluded_words.len());
    for seller in &config.filters.excluded_sellers {
        println!("  Excluded seller: {}", seller);
    }

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Catalogue: {}", config.output.catalogue_path);

    println!("\nRegions ({}):", config.regions.len());
    for (name, id) in &config.regions {
        println!("  - {} ({})", name, id);
    }

    println!("\n✓ Configuration is valid (hash: {})", config_hash);
    Ok(())
}
