//! Batch harvesting of competitor listings
//!
//! Runs a search crawl for every stored search phrase in every stored city
//! and records the kept listings. Each phrase has its own excluded words on
//! top of the configured filters. Listings are written once per phrase, so
//! an interrupted run keeps the phrases it finished.

use crate::catalogue::{CrawlOrchestrator, FilterCriteria, SearchQuery};
use crate::client::PageSource;
use crate::config::FiltersConfig;
use crate::storage::{CompetitorListing, RunStatus, Storage};
use crate::HarvestError;

/// Outcome of one batch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestSummary {
    pub run_id: i64,
    pub phrases: usize,

    /// Crawls that completed, one per phrase and city
    pub crawls: usize,

    pub listings: usize,

    /// Cities without a known region id
    pub skipped_cities: usize,

    /// Crawls aborted by an index failure
    pub failed_crawls: usize,
}

/// Runs a batch harvest and records it as a run
///
/// The run is marked `completed` when every phrase was processed, `failed`
/// when a storage error stopped the batch. Crawl failures for a single city
/// are logged and counted; they do not stop the batch.
pub async fn run_batch<S, P>(
    orchestrator: &CrawlOrchestrator<'_, P>,
    storage: &mut S,
    filters: &FiltersConfig,
    config_hash: &str,
) -> Result<HarvestSummary, HarvestError>
where
    S: Storage,
    P: PageSource + ?Sized,
{
    let run_id = storage.create_run(config_hash)?;
    tracing::info!("Started harvest run {}", run_id);

    match harvest(orchestrator, storage, filters, run_id).await {
        Ok(summary) => {
            storage.finish_run(run_id, RunStatus::Completed)?;
            tracing::info!(
                "Harvest run {} completed: {} listings from {} crawls",
                run_id,
                summary.listings,
                summary.crawls
            );
            Ok(summary)
        }
        Err(e) => {
            tracing::error!("Harvest run {} failed: {}", run_id, e);
            if let Err(status_err) = storage.finish_run(run_id, RunStatus::Failed) {
                tracing::error!("Could not mark run {} as failed: {}", run_id, status_err);
            }
            Err(e)
        }
    }
}

async fn harvest<S, P>(
    orchestrator: &CrawlOrchestrator<'_, P>,
    storage: &mut S,
    filters: &FiltersConfig,
    run_id: i64,
) -> Result<HarvestSummary, HarvestError>
where
    S: Storage,
    P: PageSource + ?Sized,
{
    let phrases = storage.get_search_phrases()?;
    let cities = storage.get_cities()?;

    let mut summary = HarvestSummary {
        run_id,
        phrases: phrases.len(),
        ..HarvestSummary::default()
    };

    if phrases.is_empty() || cities.is_empty() {
        tracing::warn!(
            "Nothing to harvest: {} phrases, {} cities",
            phrases.len(),
            cities.len()
        );
        return Ok(summary);
    }

    for phrase in &phrases {
        let words = storage.get_excluded_words(phrase.id)?;
        let criteria = FilterCriteria::from(filters).with_excluded_words(words);
        let mut listings = Vec::new();

        for city in &cities {
            if !orchestrator.regions().contains(&city.name) {
                tracing::warn!("Skipping city '{}': no region id configured", city.name);
                summary.skipped_cities += 1;
                continue;
            }

            let query = SearchQuery::new(phrase.phrase.clone(), city.name.clone());
            match orchestrator.crawl_search(&query, &criteria).await {
                Ok(catalogue) => {
                    summary.crawls += 1;
                    listings.extend(
                        catalogue
                            .iter()
                            .map(|record| CompetitorListing::new(run_id, phrase, city, record)),
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        "Crawl for '{}' in {} failed, continuing: {}",
                        phrase.phrase,
                        city.name,
                        e
                    );
                    summary.failed_crawls += 1;
                }
            }
        }

        summary.listings += storage.insert_listings(&listings)?;
        tracing::info!(
            "Phrase '{}' (item {}): {} listings stored",
            phrase.phrase,
            phrase.item_id,
            listings.len()
        );
    }

    Ok(summary)
}
