use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio_retry::Retry;
use tokio_retry::strategy::FixedInterval;
use tracing::{debug, error, info, warn};

use crate::config::{AppConfig, SelectorConfig, VisitorConfig};
use crate::content_expander::ContentExpander;
use crate::models::{BiomarkerSet, ProductRecord, ProductStub};
use crate::page_loader::PageLoader;
use crate::plugins::{BiomarkerExtractor, DocumentContext, ExtractionOutcome};
use crate::price::{PriceNormalizer, PriceOutcome};
use crate::scraper::RenderSession;
use crate::utils::error::{Result, ScrapeError};

pub const ZERO_PRICE_REASON: &str = "Zero price product";
pub const NO_BIOMARKERS_ERROR: &str = "No biomarkers found after multiple attempts";

/// Click the cookie-consent button if the banner is showing.
///
/// Safe to call on every page; failures are logged and ignored.
pub async fn dismiss_cookie_banner(session: &dyn RenderSession, selector: &str) -> bool {
    match session.exists(selector).await {
        Ok(true) => match session.click(selector).await {
            Ok(clicked) => {
                if clicked {
                    debug!("Accepted cookie banner");
                }
                clicked
            }
            Err(e) => {
                debug!("Cookie banner click failed: {}", e);
                false
            }
        },
        Ok(false) => false,
        Err(e) => {
            debug!("Cookie banner lookup failed: {}", e);
            false
        }
    }
}

/// Turns one product stub into a finished record.
pub struct ProductPageVisitor {
    loader: PageLoader,
    expander: ContentExpander,
    extractor: BiomarkerExtractor,
    normalizer: PriceNormalizer,
    config: VisitorConfig,
    selectors: SelectorConfig,
}

impl ProductPageVisitor {
    pub fn new(
        loader: PageLoader,
        expander: ContentExpander,
        extractor: BiomarkerExtractor,
        normalizer: PriceNormalizer,
        config: VisitorConfig,
        selectors: SelectorConfig,
    ) -> Self {
        Self {
            loader,
            expander,
            extractor,
            normalizer,
            config,
            selectors,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(
            PageLoader::new(&config.loader),
            ContentExpander::new(config.expander.clone(), &config.selectors),
            BiomarkerExtractor::from_config(config)?,
            PriceNormalizer::with_zero_patterns(&config.vocabulary.zero_price_patterns),
            config.visitor.clone(),
            config.selectors.clone(),
        ))
    }

    /// Visit the product page behind `stub`. Never fails: every problem ends
    /// up in the returned record.
    pub async fn visit(&self, session: &dyn RenderSession, stub: &ProductStub, source_url: &str) -> ProductRecord {
        let mut record = ProductRecord::new(stub, source_url);

        if let Err(e) = self.loader.load(session, &stub.link).await {
            error!("Failed to load {}: {}", stub.link, e);
            record.fail(e.to_string());
            return record;
        }

        if let Err(e) = self.process(session, &mut record).await {
            error!("Error processing {}: {}", stub.link, e);
            record.fail(e.to_string());
        }

        log_product_summary(&record);
        record
    }

    async fn process(&self, session: &dyn RenderSession, record: &mut ProductRecord) -> Result<()> {
        dismiss_cookie_banner(session, &self.selectors.cookie_accept).await;

        let content_wait = Duration::from_millis(self.config.content_wait_ms);
        match session.wait_for_selector(&self.selectors.content_ready, content_wait).await {
            Ok(true) => {}
            Ok(false) => warn!("Content did not appear on {}; continuing with what is there", record.link),
            Err(e) => warn!("Content wait failed on {}: {}", record.link, e),
        }

        let price = self.read_price(session).await.unwrap_or_else(|e| {
            warn!("Price lookup failed for {}: {}", record.name, e);
            PriceOutcome::Unparsed
        });
        match price {
            PriceOutcome::Zero => {
                info!("Skipping zero price product: {}", record.name);
                record.skip(ZERO_PRICE_REASON);
                return Ok(());
            }
            PriceOutcome::Amount(amount) => record.price = Some(amount),
            PriceOutcome::Unparsed => {
                warn!("Could not parse price for {}", record.name);
                record.price = None;
            }
        }

        let context = DocumentContext::new(record.link.as_str(), record.name.as_str());
        let (attempts, outcome) = self.extract_with_retries(session, &context).await;
        record.extraction_attempts = attempts;

        match outcome {
            Some(outcome) => record.set_biomarkers(outcome.biomarkers),
            None => {
                warn!("No biomarkers found for {} after {} attempts", record.name, attempts);
                record.set_biomarkers(BiomarkerSet::empty());
                record.error = Some(NO_BIOMARKERS_ERROR.to_string());
            }
        }

        Ok(())
    }

    async fn read_price(&self, session: &dyn RenderSession) -> Result<PriceOutcome> {
        let price_wait = Duration::from_millis(self.config.price_wait_ms);
        if !session.wait_for_selector(&self.selectors.price, price_wait).await? {
            debug!("Price element not found");
            return Ok(PriceOutcome::Unparsed);
        }

        let raw = session.text_of(&self.selectors.price).await?.unwrap_or_default();
        let outcome = self.normalizer.normalize(&raw);
        debug!("Price text {:?} -> {:?}", raw.trim(), outcome);
        Ok(outcome)
    }

    async fn extract_with_retries(
        &self,
        session: &dyn RenderSession,
        context: &DocumentContext,
    ) -> (u32, Option<ExtractionOutcome>) {
        let attempts = AtomicU32::new(0);
        let pauses = FixedInterval::from_millis(self.config.retry_delay_ms)
            .take(self.config.biomarker_attempts.saturating_sub(1) as usize);

        let result = Retry::start(pauses, || self.attempt_extraction(session, context, &attempts)).await;
        (attempts.load(Ordering::SeqCst), result.ok())
    }

    async fn attempt_extraction(
        &self,
        session: &dyn RenderSession,
        context: &DocumentContext,
        attempts: &AtomicU32,
    ) -> Result<ExtractionOutcome> {
        let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Biomarker extraction attempt {}/{}", attempt, self.config.biomarker_attempts);

        if self.expander.expand(session).await {
            tokio::time::sleep(Duration::from_millis(self.config.settle_ms)).await;
        }

        match self.extractor.extract(session, context).await {
            Ok(outcome) if !outcome.biomarkers.is_empty() => {
                debug!(
                    "Attempt {} found biomarkers via {}",
                    attempt,
                    outcome.strategy.as_deref().unwrap_or("unknown")
                );
                Ok(outcome)
            }
            Ok(_) => Err(ScrapeError::Extraction(format!("no biomarkers on attempt {}", attempt))),
            Err(e) => {
                warn!("Extraction attempt {} failed: {}", attempt, e);
                Err(e)
            }
        }
    }
}

pub fn log_product_summary(record: &ProductRecord) {
    info!("Product: {}", record.name);
    match record.price {
        Some(price) => info!("  Price: €{}", price),
        None => info!("  Price: unknown"),
    }
    info!("  URL: {}", record.link);

    match (&record.biomarkers, record.category_count) {
        (BiomarkerSet::Categorized(groups), Some(categories)) => {
            info!("  Biomarkers: {} in {} categories", record.biomarker_count, categories);
            for group in groups {
                debug!("    {}: {}", group.category, group.markers.join(", "));
            }
        }
        (set, _) => {
            info!("  Biomarkers: {}", record.biomarker_count);
            if !set.is_empty() {
                debug!("    {}", set.marker_names().join(", "));
            }
        }
    }

    if let Some(error) = &record.error {
        info!("  Error: {}", error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::MockRenderSession;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    const PAGE: &str = r#"
        <div class="price-wrapper"><span class="main-price">€ 149,00</span></div>
        <div class="desc-wrapper"><ol><li>Vitamine D</li><li>Ferritine</li></ol></div>
    "#;

    const EMPTY_PAGE: &str = r#"<div class="desc-wrapper"><p>Binnenkort meer informatie</p></div>"#;

    fn fast_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.loader.max_rounds = 1;
        config.loader.backoff_step_ms = 0;
        config.visitor.settle_ms = 0;
        config.visitor.retry_delay_ms = 0;
        config
    }

    fn stub() -> ProductStub {
        ProductStub {
            name: "Check-up Basis".to_string(),
            link: "https://shop.example/bloedtest/check-up-basis".to_string(),
        }
    }

    /// Session that loads fine, has no cookie banner or toggle, and shows `price`.
    fn session_with(price: &'static str) -> MockRenderSession {
        let mut session = MockRenderSession::new();
        session.expect_navigate().returning(|_, _, _| Ok(()));
        session.expect_exists().returning(|_| Ok(false));
        session.expect_wait_for_selector().returning(|_, _| Ok(true));
        session
            .expect_text_of()
            .returning(move |_| Ok(Some(price.to_string())));
        session
    }

    #[tokio::test]
    async fn test_visit_collects_price_and_biomarkers() {
        let mut session = session_with("€ 149,00");
        session.expect_content().returning(|| Ok(PAGE.to_string()));

        let visitor = ProductPageVisitor::from_config(&fast_config()).unwrap();
        let record = visitor.visit(&session, &stub(), "https://shop.example/bloedtest/").await;

        assert_eq!(record.price, Some(Decimal::from_str("149.00").unwrap()));
        assert_eq!(record.biomarker_count, 2);
        assert_eq!(record.extraction_attempts, 1);
        assert_eq!(record.source_url, "https://shop.example/bloedtest/");
        assert!(record.error.is_none());
        assert!(!record.skipped);
    }

    #[tokio::test]
    async fn test_zero_price_skips_extraction() {
        let mut session = session_with("€0,-");
        session.expect_content().never();

        let visitor = ProductPageVisitor::from_config(&fast_config()).unwrap();
        let record = visitor.visit(&session, &stub(), "https://shop.example/bloedtest/").await;

        assert!(record.skipped);
        assert_eq!(record.price, Some(Decimal::ZERO));
        assert_eq!(record.reason.as_deref(), Some(ZERO_PRICE_REASON));
        assert!(record.biomarkers.is_empty());
        assert_eq!(record.biomarker_count, 0);
        assert_eq!(record.extraction_attempts, 0);
    }

    #[tokio::test]
    async fn test_unparsable_price_still_extracts() {
        let mut session = session_with("Prijs op aanvraag");
        session.expect_content().returning(|| Ok(PAGE.to_string()));

        let visitor = ProductPageVisitor::from_config(&fast_config()).unwrap();
        let record = visitor.visit(&session, &stub(), "https://shop.example/bloedtest/").await;

        assert_eq!(record.price, None);
        assert_eq!(record.biomarker_count, 2);
    }

    #[tokio::test]
    async fn test_load_failure_gives_error_record() {
        let mut session = MockRenderSession::new();
        session
            .expect_navigate()
            .returning(|_, _, _| Err(ScrapeError::Browser("net::ERR_CONNECTION_RESET".to_string())));
        session.expect_text_of().never();

        let visitor = ProductPageVisitor::from_config(&fast_config()).unwrap();
        let record = visitor.visit(&session, &stub(), "https://shop.example/bloedtest/").await;

        assert_eq!(record.price, None);
        assert!(record.biomarkers.is_empty());
        assert_eq!(record.biomarker_count, 0);
        assert!(record.error.as_deref().unwrap().starts_with("Navigation failed"));
    }

    #[tokio::test]
    async fn test_exhausted_attempts_record_error() {
        let mut session = session_with("€ 59,95");
        session.expect_content().times(3).returning(|| Ok(EMPTY_PAGE.to_string()));

        let visitor = ProductPageVisitor::from_config(&fast_config()).unwrap();
        let record = visitor.visit(&session, &stub(), "https://shop.example/bloedtest/").await;

        assert_eq!(record.extraction_attempts, 3);
        assert_eq!(record.error.as_deref(), Some(NO_BIOMARKERS_ERROR));
        assert_eq!(record.price, Some(Decimal::from_str("59.95").unwrap()));
        assert!(!record.skipped);
    }

    #[tokio::test]
    async fn test_failed_attempt_is_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let mut session = session_with("€ 149,00");
        session.expect_content().returning(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(ScrapeError::Browser("Execution context was destroyed".to_string()))
            } else {
                Ok(PAGE.to_string())
            }
        });

        let visitor = ProductPageVisitor::from_config(&fast_config()).unwrap();
        let record = visitor.visit(&session, &stub(), "https://shop.example/bloedtest/").await;

        assert_eq!(record.extraction_attempts, 2);
        assert_eq!(record.biomarker_count, 2);
        assert!(record.error.is_none());
    }

    #[tokio::test]
    async fn test_missing_content_still_extracts() {
        let mut session = MockRenderSession::new();
        session.expect_navigate().returning(|_, _, _| Ok(()));
        session.expect_exists().returning(|_| Ok(false));
        session
            .expect_wait_for_selector()
            .returning(|selector, _| Ok(selector != "div.price-wrapper, div.desc-wrapper"));
        session.expect_text_of().returning(|_| Ok(Some("€ 149,00".to_string())));
        session.expect_content().returning(|| Ok(PAGE.to_string()));

        let visitor = ProductPageVisitor::from_config(&fast_config()).unwrap();
        let record = visitor.visit(&session, &stub(), "https://shop.example/bloedtest/").await;

        assert_eq!(record.price, Some(Decimal::from_str("149.00").unwrap()));
        assert_eq!(record.biomarker_count, 2);
        assert!(record.error.is_none());
    }

    #[tokio::test]
    async fn test_content_wait_error_is_not_fatal() {
        let content_ready = SelectorConfig::default().content_ready;

        let mut session = MockRenderSession::new();
        session.expect_navigate().returning(|_, _, _| Ok(()));
        session.expect_exists().returning(|_| Ok(false));
        session.expect_wait_for_selector().returning(move |selector, _| {
            if selector == content_ready {
                Err(ScrapeError::Browser("Execution context was destroyed".to_string()))
            } else {
                Ok(true)
            }
        });
        session.expect_text_of().returning(|_| Ok(Some("€ 149,00".to_string())));
        session.expect_content().returning(|| Ok(PAGE.to_string()));

        let visitor = ProductPageVisitor::from_config(&fast_config()).unwrap();
        let record = visitor.visit(&session, &stub(), "https://shop.example/bloedtest/").await;

        assert_eq!(record.price, Some(Decimal::from_str("149.00").unwrap()));
        assert_eq!(record.biomarker_count, 2);
        assert!(record.error.is_none());
    }

    #[tokio::test]
    async fn test_price_read_error_leaves_price_unknown() {
        let mut session = MockRenderSession::new();
        session.expect_navigate().returning(|_, _, _| Ok(()));
        session.expect_exists().returning(|_| Ok(false));
        session.expect_wait_for_selector().returning(|_, _| Ok(true));
        session
            .expect_text_of()
            .returning(|_| Err(ScrapeError::Browser("Script evaluation failed".to_string())));
        session.expect_content().returning(|| Ok(PAGE.to_string()));

        let visitor = ProductPageVisitor::from_config(&fast_config()).unwrap();
        let record = visitor.visit(&session, &stub(), "https://shop.example/bloedtest/").await;

        assert_eq!(record.price, None);
        assert_eq!(record.biomarker_count, 2);
        assert!(record.error.is_none());
        assert!(!record.skipped);
    }

    #[tokio::test]
    async fn test_cookie_banner_is_clicked_when_present() {
        let mut session = MockRenderSession::new();
        session
            .expect_exists()
            .withf(|selector| selector.starts_with("button#Cybot"))
            .returning(|_| Ok(true));
        session.expect_click().times(1).returning(|_| Ok(true));

        let selectors = SelectorConfig::default();
        assert!(dismiss_cookie_banner(&session, &selectors.cookie_accept).await);
    }
}
