//! Statistics generation from the harvest database
//!
//! This module provides functionality for extracting and displaying
//! harvest statistics from the storage layer.

use crate::storage::{RunRecord, Storage};
use crate::HarvestError;

/// Harvest statistics summary
#[derive(Debug, Clone)]
pub struct HarvestStatistics {
    /// Total number of stored listings across all runs
    pub total_listings: u64,

    /// Listing count per city, in city insertion order
    pub listings_by_city: Vec<(String, u64)>,

    pub search_phrases: usize,

    pub cities: usize,

    /// Most recent run, if any
    pub last_run: Option<RunRecord>,

    /// Listings stored by the most recent run
    pub last_run_listings: u64,
}

/// Loads statistics from storage
pub fn load_statistics(storage: &dyn Storage) -> Result<HarvestStatistics, HarvestError> {
    let total_listings = storage.count_listings()?;
    let listings_by_city = storage.count_listings_by_city()?;
    let search_phrases = storage.get_search_phrases()?.len();
    let cities = storage.get_cities()?.len();

    let last_run = storage.get_latest_run()?;
    let last_run_listings = match &last_run {
        Some(run) => storage.count_listings_for_run(run.id)?,
        None => 0,
    };

    Ok(HarvestStatistics {
        total_listings,
        listings_by_city,
        search_phrases,
        cities,
        last_run,
        last_run_listings,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  Search phrases: {}", stats.search_phrases);
    println!("  Cities: {}", stats.cities);
    println!("  Total listings stored: {}", stats.total_listings);
    println!();

    if !stats.listings_by_city.is_empty() {
        println!("Listings by City:");
        let mut city_counts: Vec<_> = stats.listings_by_city.iter().collect();
        city_counts.sort_by(|a, b| b.1.cmp(&a.1));

        for (city, count) in city_counts {
            let percentage = if stats.total_listings > 0 {
                (*count as f64 / stats.total_listings as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", city, count, percentage);
        }
        println!();
    }

    match &stats.last_run {
        Some(run) => {
            println!("Last Run:");
            println!("  ID: {}", run.id);
            println!("  Status: {}", run.status.to_db_string());
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            println!("  Listings stored: {}", stats.last_run_listings);
        }
        None => println!("No harvest runs recorded yet."),
    }
}
