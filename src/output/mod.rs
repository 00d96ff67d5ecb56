//! Output module for crawl results and harvest reports
//!
//! This module handles:
//! - Exporting catalogues as JSON
//! - Printing crawl summaries
//! - Loading and printing harvest statistics

mod json;
pub mod stats;

pub use json::{read_catalogue_json, write_catalogue_json};
pub use stats::{load_statistics, print_statistics, HarvestStatistics};

use crate::catalogue::Catalogue;

/// Prints the counters of one crawl to stdout
pub fn print_crawl_summary(catalogue: &Catalogue) {
    let stats = &catalogue.stats;

    println!("=== Crawl Summary ===\n");
    println!("  Listings kept: {}", stats.kept);
    println!(
        "  Dropped: {} (condition {}, excluded words {}, excluded sellers {})",
        stats.dropped(),
        stats.dropped_condition,
        stats.dropped_words,
        stats.dropped_sellers
    );
    println!("  Degraded listings: {}", stats.degraded);
    println!("  Non-listing index entries: {}", stats.skipped_stubs);
    println!(
        "  Requests: {} index, {} detail",
        stats.index_fetches, stats.detail_fetches
    );
}
