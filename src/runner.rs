use serde::Serialize;
use std::time::Duration;
use tokio_retry::Retry;
use tokio_retry::strategy::FixedInterval;
use tracing::{error, info, warn};

use crate::catalog::CatalogWalker;
use crate::config::{AppConfig, StorageConfig};
use crate::logging::log_section;
use crate::models::{ProductRecord, ProductStub};
use crate::product_visitor::ProductPageVisitor;
use crate::scraper::RenderSession;
use crate::store::{JsonCatalogStore, MergeOutcome};
use crate::utils::error::Result;

/// Tally of one run across all listing URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub sources: usize,
    pub failed_sources: usize,
    pub products_found: usize,
    pub visited: usize,
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    /// Records saved with an error (load failure or no biomarkers).
    pub with_errors: usize,
    /// Records that could not be persisted at all.
    pub lost: usize,
}

impl RunSummary {
    pub fn saved(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Drives listings into stubs, stubs into records, and records into the store.
pub struct ScrapeRunner {
    walker: CatalogWalker,
    visitor: ProductPageVisitor,
    store: JsonCatalogStore,
    storage: StorageConfig,
    politeness_delay: Duration,
}

impl ScrapeRunner {
    pub fn new(
        walker: CatalogWalker,
        visitor: ProductPageVisitor,
        store: JsonCatalogStore,
        storage: StorageConfig,
        politeness_delay: Duration,
    ) -> Self {
        Self {
            walker,
            visitor,
            store,
            storage,
            politeness_delay,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(
            CatalogWalker::from_config(config)?,
            ProductPageVisitor::from_config(config)?,
            JsonCatalogStore::new(config.storage.output_path.clone()),
            config.storage.clone(),
            Duration::from_millis(config.visitor.politeness_delay_ms),
        ))
    }

    pub fn store(&self) -> &JsonCatalogStore {
        &self.store
    }

    /// Scrape every listing in turn. A listing that cannot be traversed is
    /// logged and skipped; products are visited strictly one after another.
    pub async fn run(&self, session: &dyn RenderSession, listing_urls: &[String]) -> RunSummary {
        let mut summary = RunSummary::default();

        for listing_url in listing_urls {
            summary.sources += 1;
            log_section(&format!("Scraping listing: {}", listing_url));

            let stubs = match self.walker.collect(session, listing_url).await {
                Ok(stubs) => stubs,
                Err(e) => {
                    error!("Failed to collect products from {}: {}", listing_url, e);
                    summary.failed_sources += 1;
                    continue;
                }
            };

            summary.products_found += stubs.len();
            self.scrape_products(session, &stubs, listing_url, &mut summary).await;
        }

        info!(
            "Run finished: {} products found, {} saved ({} new, {} updated), {} skipped, {} with errors, {} lost",
            summary.products_found,
            summary.saved(),
            summary.inserted,
            summary.updated,
            summary.skipped,
            summary.with_errors,
            summary.lost
        );
        summary
    }

    async fn scrape_products(
        &self,
        session: &dyn RenderSession,
        stubs: &[ProductStub],
        source_url: &str,
        summary: &mut RunSummary,
    ) {
        for (index, stub) in stubs.iter().enumerate() {
            log_section(&format!("Product {}/{}: {}", index + 1, stubs.len(), stub.name));

            let record = self.visitor.visit(session, stub, source_url).await;
            summary.visited += 1;

            if record.skipped {
                summary.skipped += 1;
            }
            if record.error.is_some() {
                summary.with_errors += 1;
            }

            if record.skipped && !self.storage.save_skipped {
                info!("Not saving skipped product: {}", record.name);
            } else {
                match self.save_with_retries(&record, source_url).await {
                    Ok(MergeOutcome::Inserted) => summary.inserted += 1,
                    Ok(MergeOutcome::Updated) => summary.updated += 1,
                    Err(e) => {
                        error!("Lost product {} after save retries: {}", record.link, e);
                        summary.lost += 1;
                    }
                }
            }

            if index + 1 < stubs.len() && !self.politeness_delay.is_zero() {
                tokio::time::sleep(self.politeness_delay).await;
            }
        }
    }

    async fn save_with_retries(&self, record: &ProductRecord, source_url: &str) -> Result<MergeOutcome> {
        let pauses = FixedInterval::from_millis(self.storage.save_retry_delay_ms)
            .take(self.storage.save_retries as usize);

        Retry::start(pauses, || {
            let result = self.store.merge(record, source_url);
            if let Err(e) = &result {
                warn!("Saving {} failed: {}", record.link, e);
            }
            std::future::ready(result)
        })
        .await
    }
}
