//! Crawl orchestration
//!
//! Composes the paginator, the extractor and the filter pipeline into the
//! two public crawl operations. One fetch session is shared by every index
//! and detail request; requests are strictly sequential (one index page,
//! then its detail pages, then the next index page).

use crate::catalogue::extractor::{Extraction, ExtractionError, PageExtractor};
use crate::catalogue::filter::{FilterPipeline, Verdict};
use crate::catalogue::model::{Catalogue, FilterCriteria, SearchQuery, ShopQuery};
use crate::catalogue::paginator::{CatalogPaginator, IndexMode, RetryPolicy};
use crate::client::PageSource;
use crate::config::ClientConfig;
use crate::regions::RegionTable;
use crate::state::CrawlPhase;
use crate::url::{detail_url, parse_seller_hash};
use crate::HarvestError;
use url::Url;

/// Settings shared by both crawl modes
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Marketplace origin the endpoints and listing paths resolve against
    pub base_url: Url,
    pub retry: RetryPolicy,
}

impl CrawlSettings {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            retry: RetryPolicy::none(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, HarvestError> {
        Ok(Self::new(Url::parse(&config.base_url)?).with_retry(RetryPolicy::from_config(config)))
    }
}

/// Runs catalogue crawls over a borrowed fetch session
pub struct CrawlOrchestrator<'a, S: PageSource + ?Sized> {
    source: &'a S,
    regions: &'a RegionTable,
    settings: CrawlSettings,
    extractor: PageExtractor,
}

impl<'a, S: PageSource + ?Sized> CrawlOrchestrator<'a, S> {
    pub fn new(source: &'a S, regions: &'a RegionTable, settings: CrawlSettings) -> Self {
        Self {
            source,
            regions,
            settings,
            extractor: PageExtractor::default(),
        }
    }

    pub fn with_extractor(mut self, extractor: PageExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn regions(&self) -> &RegionTable {
        self.regions
    }

    /// Crawls search results for a phrase in a region
    ///
    /// The region is resolved before any request is made; an unknown region
    /// is a `HarvestError::Configuration`. Records pass the condition
    /// predicate (when required) and the excluded word and seller predicates.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use listing_harvester::catalogue::{CrawlOrchestrator, CrawlSettings, FilterCriteria, SearchQuery};
    /// use listing_harvester::{HttpSession, RegionTable};
    /// use listing_harvester::config::load_config;
    /// use std::path::Path;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = load_config(Path::new("harvest.toml"))?;
    /// let session = HttpSession::new(&config.client)?;
    /// let regions = RegionTable::new(config.regions.clone());
    /// let orchestrator = CrawlOrchestrator::new(&session, &regions, CrawlSettings::from_config(&config.client)?);
    ///
    /// let catalogue = orchestrator
    ///     .crawl_search(&SearchQuery::new("lamp", "Москва"), &FilterCriteria::default())
    ///     .await?;
    /// println!("{} listings", catalogue.len());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn crawl_search(
        &self,
        query: &SearchQuery,
        criteria: &FilterCriteria,
    ) -> Result<Catalogue, HarvestError> {
        let region_id = self.regions.resolve(&query.region_name)?;

        tracing::info!(
            "Search crawl for '{}' in {} (region {})",
            query.text,
            query.region_name,
            region_id
        );

        let paginator = CatalogPaginator::search(
            query.text.clone(),
            region_id,
            self.settings.base_url.clone(),
            self.settings.retry,
        );

        self.run(paginator, &FilterPipeline::for_search(criteria))
            .await
    }

    /// Crawls every active listing of a seller's storefront
    ///
    /// A URL without a recognizable seller hash yields an empty catalogue
    /// and no request is made. No filter is applied in this mode.
    pub async fn crawl_shop(&self, query: &ShopQuery) -> Result<Catalogue, HarvestError> {
        let seller = match parse_seller_hash(&query.shop_url) {
            Ok(seller) => seller,
            Err(e) => {
                tracing::warn!("No seller hash in {}: {}", query.shop_url, e);
                return Ok(Catalogue::default());
            }
        };

        tracing::info!("Shop crawl for seller {}", seller);

        let paginator = CatalogPaginator::shop(
            seller,
            self.settings.base_url.clone(),
            self.settings.retry,
        );

        self.run(paginator, &FilterPipeline::for_shop()).await
    }

    async fn run<M: IndexMode>(
        &self,
        mut paginator: CatalogPaginator<M>,
        pipeline: &FilterPipeline,
    ) -> Result<Catalogue, HarvestError> {
        let mut catalogue = Catalogue::default();
        let mut phase = CrawlPhase::Idle;

        loop {
            phase = phase.transition(CrawlPhase::FetchingIndexPage)?;

            let batch = match paginator.next_batch(self.source).await {
                Ok(batch) => batch,
                Err(e) => {
                    tracing::error!("Crawl aborted: {}", e);
                    return Err(e);
                }
            };

            let Some(batch) = batch else {
                phase = phase
                    .transition(CrawlPhase::PageEmpty)?
                    .transition(CrawlPhase::Done)?;
                break;
            };

            phase = phase
                .transition(CrawlPhase::ItemsPresent)?
                .transition(CrawlPhase::ExtractingItems)?;

            catalogue.stats.skipped_stubs += batch.skipped;

            for stub in batch.stubs {
                let extraction = match detail_url(&self.settings.base_url, &stub.url_path) {
                    Ok(url) => {
                        catalogue.stats.detail_fetches += 1;
                        self.extractor.extract(self.source, &url).await
                    }
                    Err(e) => {
                        tracing::warn!("Unresolvable listing path {:?}: {}", stub.url_path, e);
                        Extraction::degraded(
                            stub.url_path.clone(),
                            ExtractionError::InvalidUrl(e.to_string()),
                        )
                    }
                };

                if extraction.is_degraded() {
                    catalogue.stats.degraded += 1;
                }

                match pipeline.evaluate(&extraction.record) {
                    Verdict::Keep => catalogue.push(extraction.record),
                    Verdict::Drop(reason) => {
                        tracing::debug!("Dropped {} ({})", extraction.record.url, reason);
                        catalogue.stats.record_drop(reason);
                    }
                }
            }

            tracing::info!(
                "Index position {} done: {} kept so far",
                batch.position,
                catalogue.len()
            );
        }

        catalogue.stats.index_fetches = paginator.index_fetches();

        tracing::info!(
            "Crawl {}: {} kept, {} dropped, {} degraded, {} index pages",
            phase,
            catalogue.stats.kept,
            catalogue.stats.dropped(),
            catalogue.stats.degraded,
            catalogue.stats.index_fetches
        );

        Ok(catalogue)
    }
}
